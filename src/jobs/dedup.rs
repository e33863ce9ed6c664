use crate::jobs::record::JobRecord;
use std::collections::HashMap;

/// Keep one record per `id`: the last one seen, at the position where that id
/// first appeared.
pub fn dedupe_by_id(jobs: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<JobRecord> = Vec::with_capacity(jobs.len());

    for job in jobs {
        match slots.get(&job.id) {
            Some(&slot) => unique[slot] = job,
            None => {
                slots.insert(job.id.clone(), unique.len());
                unique.push(job);
            }
        }
    }

    unique
}
