use std::cmp::Reverse;

use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

use super::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenTask {
    pub id: Uuid,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub task_id: Uuid,
    pub assignee_id: Uuid,
}

/// Deals every open task to a member, hardest first, always to whoever carries
/// the least difficulty so far. Equal-difficulty tasks and equally loaded
/// members are ordered by `rng`, so no member is favoured across rounds.
///
/// Afterwards no two members' loads differ by more than the hardest task.
pub fn plan_assignments<R>(tasks: &[OpenTask], members: &[Uuid], rng: &mut R) -> Vec<Assignment>
where
    R: Rng + ?Sized,
{
    if members.is_empty() {
        return Vec::new();
    }

    let mut tasks = tasks.to_vec();
    tasks.shuffle(rng);
    tasks.sort_by_key(|task| Reverse(task.difficulty));

    let mut members = members.to_vec();
    members.shuffle(rng);
    let mut loads = vec![0u32; members.len()];

    tasks
        .iter()
        .map(|task| {
            let slot = loads
                .iter()
                .enumerate()
                .min_by_key(|(_, load)| **load)
                .map(|(slot, _)| slot)
                .unwrap_or_default();
            loads[slot] += u32::from(task.difficulty.get());

            Assignment { task_id: task.id, assignee_id: members[slot] }
        })
        .collect()
}
