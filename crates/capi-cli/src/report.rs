//! Plain-text job summary for operators.

use capi_types::{aggregate_details, Job, JobState};

pub fn summary(job: &Job) -> String {
    let mut lines = vec![
        format!("job:       {}", job.guid),
        format!("operation: {}", job.operation),
        format!("state:     {}", job.state),
    ];
    lines.extend(
        job.warnings
            .iter()
            .map(|w| format!("warning:   {}", w.detail)),
    );
    if job.state == JobState::Failed {
        lines.push(format!("errors:    {}", aggregate_details(&job.errors)));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
