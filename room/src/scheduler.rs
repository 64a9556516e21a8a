//! Who answers which topic and who draws which area, round by round.
//!
//! Members and topics share an index: topic `i` was sent by `senders[i]`.
//! Per draw round the drawers form a permutation of the members, so
//! everybody paints exactly one topic per round.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{ErrorKind, RoomResult};

const MAX_RESHUFFLE: usize = 16;
const MAX_RESTART: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawerSlot<T> {
    pub drawer: T,
    pub area: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment<T> {
    pub answerer: T,
    /// One slot per draw round.
    pub drawers: Vec<DrawerSlot<T>>,
}

/// Builds one assignment per sender.
///
/// * nobody answers or draws their own topic
/// * answerers form a permutation
/// * with three or more members the answerer never draws their topic
/// * a topic's drawer repeats only after every eligible drawer had a turn
/// * every topic visits each of the `areas` board areas once
pub fn schedule<T, R>(senders: &[T], areas: usize, rng: &mut R) -> RoomResult<Vec<Assignment<T>>>
where
    T: Copy,
    R: Rng + ?Sized,
{
    let n = senders.len();
    if n < 2 {
        return Err(ErrorKind::NotEnoughMembers);
    }
    if areas == 0 {
        return Err(ErrorKind::InvalidDrawCount);
    }

    let cycle = answer_cycle(n, rng);
    let mut answers = vec![0; n];
    for pos in 0..n {
        answers[cycle[pos]] = cycle[(pos + 1) % n];
    }

    let columns = drawer_columns(n, areas, &answers, &cycle, rng);

    let assignments = (0..n)
        .map(|topic| {
            let mut order: Vec<usize> = (0..areas).collect();
            order.shuffle(rng);
            let drawers = columns
                .iter()
                .zip(order)
                .map(|(column, area)| DrawerSlot { drawer: senders[column[topic]], area })
                .collect();
            Assignment { answerer: senders[answers[topic]], drawers }
        })
        .collect();
    Ok(assignments)
}

/// A random cyclic order; each member answers the topic of the next one in
/// the cycle, which rules out fixed points.
fn answer_cycle<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut cycle: Vec<usize> = (0..n).collect();
    cycle.shuffle(rng);
    cycle
}

/// Distinct drawers a topic can have.
fn quota(n: usize) -> usize {
    if n >= 3 {
        n - 2
    } else {
        1
    }
}

fn eligible(n: usize, answers: &[usize], topic: usize, member: usize) -> bool {
    member != topic && (n < 3 || member != answers[topic])
}

/// `columns[round][topic]` is the member drawing `topic` in `round`.
fn drawer_columns<R: Rng + ?Sized>(
    n: usize,
    areas: usize,
    answers: &[usize],
    cycle: &[usize],
    rng: &mut R,
) -> Vec<Vec<usize>> {
    for _ in 0..MAX_RESTART {
        if let Some(columns) = random_columns(n, areas, answers, rng) {
            return columns;
        }
    }
    tracing::debug!(members = n, areas, "falling back to cyclic drawer schedule");
    cyclic_columns(n, areas, cycle, rng)
}

fn random_columns<R: Rng + ?Sized>(
    n: usize,
    areas: usize,
    answers: &[usize],
    rng: &mut R,
) -> Option<Vec<Vec<usize>>> {
    let quota = quota(n);
    let mut used = vec![vec![false; n]; n];
    let mut used_count = vec![0; n];
    let mut columns = Vec::with_capacity(areas);

    for _ in 0..areas {
        for topic in 0..n {
            if used_count[topic] == quota {
                used[topic].iter_mut().for_each(|u| *u = false);
                used_count[topic] = 0;
            }
        }

        let mut column: Vec<usize> = (0..n).collect();
        let mut placed = false;
        for _ in 0..MAX_RESHUFFLE {
            column.shuffle(rng);
            placed = column
                .iter()
                .enumerate()
                .all(|(topic, &member)| eligible(n, answers, topic, member) && !used[topic][member]);
            if placed {
                break;
            }
        }
        if !placed {
            return None;
        }

        for (topic, &member) in column.iter().enumerate() {
            used[topic][member] = true;
            used_count[topic] += 1;
        }
        columns.push(column);
    }
    Some(columns)
}

/// Walks the answer cycle with a fixed stride per round. Stride 0 is the
/// sender and stride 1 the answerer, so strides `2..n` are always valid and
/// pairwise distinct.
fn cyclic_columns<R: Rng + ?Sized>(
    n: usize,
    areas: usize,
    cycle: &[usize],
    rng: &mut R,
) -> Vec<Vec<usize>> {
    let mut strides: Vec<usize> = if n >= 3 { (2..n).collect() } else { vec![1] };
    strides.shuffle(rng);

    (0..areas)
        .map(|round| {
            let stride = strides[round % strides.len()];
            let mut column = vec![0; n];
            for pos in 0..n {
                column[cycle[pos]] = cycle[(pos + stride) % n];
            }
            column
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    const BOARDS: [usize; 5] = [4, 6, 9, 16, 25];

    fn check(senders: &[u32], areas: usize, plan: &[Assignment<u32>]) {
        let n = senders.len();
        assert_eq!(plan.len(), n);

        let answerers: HashSet<u32> = plan.iter().map(|a| a.answerer).collect();
        assert_eq!(answerers.len(), n, "answerers must be a permutation");

        for (topic, assignment) in plan.iter().enumerate() {
            let sender = senders[topic];
            assert_ne!(assignment.answerer, sender);
            assert_eq!(assignment.drawers.len(), areas);

            let mut area_seen: Vec<usize> = assignment.drawers.iter().map(|d| d.area).collect();
            area_seen.sort_unstable();
            assert_eq!(area_seen, (0..areas).collect::<Vec<_>>());

            for slot in &assignment.drawers {
                assert_ne!(slot.drawer, sender, "self-draw");
                if n >= 3 {
                    assert_ne!(slot.drawer, assignment.answerer, "answerer draws own answer");
                }
            }

            let head = areas.min(quota(n));
            let distinct: HashSet<u32> =
                assignment.drawers[..head].iter().map(|d| d.drawer).collect();
            assert_eq!(distinct.len(), head, "drawer repeated too early");
        }

        for round in 0..areas {
            let column: HashSet<u32> = plan.iter().map(|a| a.drawers[round].drawer).collect();
            assert_eq!(column.len(), n, "round {} is not a permutation", round);
        }
    }

    #[test]
    fn constraints_hold_for_every_size() {
        for n in 2..=15u32 {
            let senders: Vec<u32> = (100..100 + n).collect();
            for &areas in BOARDS.iter() {
                for seed in 0..4 {
                    let mut rng = StdRng::seed_from_u64(seed * 1000 + n as u64);
                    let plan = schedule(&senders, areas, &mut rng).unwrap();
                    check(&senders, areas, &plan);
                }
            }
        }
    }

    #[test]
    fn single_area_board() {
        let senders = [1u32, 2, 3];
        let mut rng = StdRng::seed_from_u64(7);
        let plan = schedule(&senders, 1, &mut rng).unwrap();
        check(&senders, 1, &plan);
    }

    #[test]
    fn cyclic_fallback_is_valid() {
        for n in 2..=15usize {
            let mut rng = StdRng::seed_from_u64(n as u64);
            let cycle = answer_cycle(n, &mut rng);
            let mut answers = vec![0; n];
            for pos in 0..n {
                answers[cycle[pos]] = cycle[(pos + 1) % n];
            }
            let columns = cyclic_columns(n, 25, &cycle, &mut rng);
            for column in &columns {
                let members: HashSet<usize> = column.iter().copied().collect();
                assert_eq!(members.len(), n);
                for (topic, &member) in column.iter().enumerate() {
                    assert!(eligible(n, &answers, topic, member));
                }
            }
        }
    }

    #[test]
    fn same_seed_same_plan() {
        let senders = [1u32, 2, 3, 4, 5];
        let a = schedule(&senders, 9, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = schedule(&senders, 9, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_invalid_input() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(schedule(&[1u32], 4, &mut rng), Err(ErrorKind::NotEnoughMembers)));
        assert!(matches!(schedule::<u32, _>(&[], 4, &mut rng), Err(ErrorKind::NotEnoughMembers)));
        assert!(matches!(schedule(&[1u32, 2], 0, &mut rng), Err(ErrorKind::InvalidDrawCount)));
    }
}
