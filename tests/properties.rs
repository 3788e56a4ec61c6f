use block_deque::BlockDeque;
use proptest::prelude::*;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Operation {
    PushBack(u16),
    PushFront(u16),
    PopBack,
    PopFront,
    Insert(usize, u16),
    Remove(usize),
    Set(usize, u16),
    Clear,
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => any::<u16>().prop_map(Operation::PushBack),
        4 => any::<u16>().prop_map(Operation::PushFront),
        2 => Just(Operation::PopBack),
        2 => Just(Operation::PopFront),
        2 => (any::<usize>(), any::<u16>()).prop_map(|(i, v)| Operation::Insert(i, v)),
        2 => any::<usize>().prop_map(Operation::Remove),
        1 => (any::<usize>(), any::<u16>()).prop_map(|(i, v)| Operation::Set(i, v)),
        1 => Just(Operation::Clear),
    ]
}

fn apply<const B: usize>(deque: &mut BlockDeque<u16, B>, expected: &mut VecDeque<u16>, op: Operation) {
    match op {
        Operation::PushBack(v) => {
            deque.push_back(v);
            expected.push_back(v);
        }
        Operation::PushFront(v) => {
            deque.push_front(v);
            expected.push_front(v);
        }
        Operation::PopBack => assert_eq!(deque.pop_back(), expected.pop_back()),
        Operation::PopFront => assert_eq!(deque.pop_front(), expected.pop_front()),
        Operation::Insert(i, v) => {
            let i = i % (expected.len() + 1);
            deque.insert(i, v);
            expected.insert(i, v);
        }
        Operation::Remove(i) => {
            if !expected.is_empty() {
                let i = i % expected.len();
                assert_eq!(Some(deque.remove(i)), expected.remove(i));
            }
        }
        Operation::Set(i, v) => {
            if !expected.is_empty() {
                let i = i % expected.len();
                deque[i] = v;
                expected[i] = v;
            }
        }
        Operation::Clear => {
            deque.clear();
            expected.clear();
        }
    }
}

fn check<const B: usize>(deque: &BlockDeque<u16, B>, expected: &VecDeque<u16>) {
    assert_eq!(deque.len(), expected.len());
    assert!(deque.iter().eq(expected.iter()));
    assert!(deque.iter().rev().eq(expected.iter().rev()));

    for (i, value) in expected.iter().enumerate() {
        assert_eq!(deque.get(i), Some(value));
    }

    assert_eq!(deque.get(expected.len()), None);
}

proptest! {
    #[test]
    fn matches_vec_deque_small_blocks(ops in proptest::collection::vec(operation(), 0..400)) {
        let mut deque = BlockDeque::<u16, 3>::with_block_size();
        let mut expected = VecDeque::new();

        for op in ops {
            apply(&mut deque, &mut expected, op);
        }

        check(&deque, &expected);
    }

    #[test]
    fn matches_vec_deque_default_blocks(ops in proptest::collection::vec(operation(), 0..400)) {
        let mut deque = BlockDeque::<u16>::new();
        let mut expected = VecDeque::new();

        for op in ops {
            apply(&mut deque, &mut expected, op);
            prop_assert_eq!(deque.len(), expected.len());
        }

        check(&deque, &expected);
    }

    #[test]
    fn cursor_steps_match_distance(len in 0usize..300, a in 0usize..300, b in 0usize..300) {
        let a = a.min(len) as isize;
        let b = b.min(len) as isize;

        let deque = BlockDeque::<usize, 8>::from_iter(0..len);
        let from = deque.begin() + a;
        let to = deque.begin() + b;

        prop_assert_eq!(to - from, b - a);
        prop_assert_eq!(from + (b - a), to);
        prop_assert_eq!(deque.index_of(to), if (b as usize) < len { Some(b as usize) } else { None });
    }

    #[test]
    fn insert_then_remove_is_identity(
        values in proptest::collection::vec(any::<u16>(), 0..200),
        index in any::<usize>(),
        value in any::<u16>(),
    ) {
        let mut deque = BlockDeque::<u16, 5>::from_iter(values.iter().copied());
        let index = index % (values.len() + 1);

        deque.insert(index, value);
        prop_assert_eq!(deque[index], value);
        prop_assert_eq!(deque.remove(index), value);
        prop_assert!(deque.iter().eq(values.iter()));
    }

    #[test]
    fn elements_never_move_on_push(fronts in 0usize..500, backs in 0usize..500) {
        let mut deque = BlockDeque::<u32, 4>::with_block_size();
        deque.push_back(0);
        let first = deque.front().map(|x| x as *const u32);

        for i in 0..fronts.max(backs) {
            if i < fronts {
                deque.push_front(1);
            }
            if i < backs {
                deque.push_back(2);
            }
        }

        prop_assert_eq!(deque.get(fronts).map(|x| x as *const u32), first);
    }
}
