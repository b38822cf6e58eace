//! Proficiency: spending skill points and level-milestone grants.

use crate::BlockReason;
use sim_content::{ContentError, ContentTables};
use sim_core::{GameState, LogEntry, LogKind};
use tracing::info;

/// Result of a skill purchase.
#[derive(Clone, Debug, PartialEq)]
pub enum SkillOutcome {
    Unlocked(LogEntry),
    Blocked(BlockReason),
}

/// Spend skill points on `skill_id`. Blocked purchases leave `state` untouched.
pub fn unlock_skill(
    state: &mut GameState,
    content: &ContentTables,
    skill_id: &str,
) -> Result<SkillOutcome, ContentError> {
    let skill = content.skill(skill_id)?;
    if state.proficiency.contains(&skill.id) {
        return Ok(SkillOutcome::Blocked(BlockReason::AlreadyUnlocked(
            skill.id.clone(),
        )));
    }
    if let Some(missing) = skill
        .requires
        .iter()
        .find(|req| !state.proficiency.contains(*req))
    {
        return Ok(SkillOutcome::Blocked(BlockReason::MissingSkill(
            missing.clone(),
        )));
    }
    if state.resources.skill_points < skill.cost {
        return Ok(SkillOutcome::Blocked(BlockReason::InsufficientSkillPoints {
            required: skill.cost,
            available: state.resources.skill_points,
        }));
    }
    state.resources.skill_points -= skill.cost;
    state.proficiency.insert(skill.id.clone());
    info!(skill = %skill.id, "skill unlocked");
    let entry = state.push_log(LogKind::Success, format!("Proficiency gained: {}.", skill.name));
    Ok(SkillOutcome::Unlocked(entry))
}

/// Grant every skill whose milestone level has been reached and whose
/// prerequisites are held. Repeats until no more skills qualify so chained
/// milestones land in one call. Returns the newly granted ids.
pub fn grant_milestone_skills(state: &mut GameState, content: &ContentTables) -> Vec<String> {
    let mut granted = Vec::new();
    loop {
        let next = content.skills().find(|s| {
            s.auto_unlock_level
                .is_some_and(|level| state.resources.level >= level)
                && !state.proficiency.contains(&s.id)
                && s.requires.iter().all(|r| state.proficiency.contains(r))
        });
        let Some(skill) = next else {
            break;
        };
        state.proficiency.insert(skill.id.clone());
        state.push_log(
            LogKind::LevelUp,
            format!("Milestone proficiency: {}.", skill.name),
        );
        granted.push(skill.id.clone());
    }
    granted
}
