//! Work order generation.

use sim_content::ContentTables;
use sim_core::{ActiveJob, RandomSource};

/// Pick a job template uniformly and instantiate it with a full countdown.
/// Returns `None` when the content defines no jobs.
pub fn roll_job(content: &ContentTables, rng: &mut dyn RandomSource) -> Option<ActiveJob> {
    let jobs = content.jobs();
    let template = &jobs[rng.pick_index(jobs.len())?];
    Some(ActiveJob {
        template_id: template.id.clone(),
        title: template.title.clone(),
        total_ms: template.duration_ms,
        time_left_ms: template.duration_ms,
        reward: template.reward.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixture;
    use sim_core::ScriptedRng;

    #[test]
    fn picks_uniformly_by_draw() {
        let content = fixture();
        let n = content.jobs().len();
        assert!(n >= 2);
        let first = roll_job(&content, &mut ScriptedRng::new([0.0])).unwrap();
        let last = roll_job(&content, &mut ScriptedRng::new([0.9999])).unwrap();
        assert_eq!(first.template_id, content.jobs()[0].id);
        assert_eq!(last.template_id, content.jobs()[n - 1].id);
        assert_eq!(first.time_left_ms, first.total_ms);
    }

    #[test]
    fn no_templates_no_job() {
        let content = ContentTables::default();
        let mut rng = ScriptedRng::new([0.5]);
        assert!(roll_job(&content, &mut rng).is_none());
        assert_eq!(rng.consumed(), 0);
    }
}
