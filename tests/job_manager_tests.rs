//! Async job lifecycle scenario: submit, observe Pending -> Processing ->
//! Completed, and confirm terminal states are final.

use pmcopilot_core::core::job_manager::JobManager;
use pmcopilot_core::core::types::JobStatus;

#[test]
fn submit_then_drive_to_completion() {
    let manager = JobManager::new();
    let job_id = manager.submit("generate a PRD".into());
    assert_eq!(manager.status(&job_id), Some(JobStatus::Pending));

    manager.mark_processing(&job_id);
    manager.update_progress(&job_id, 0.4);
    let mid = manager.result(&job_id).unwrap();
    assert_eq!(mid.status, JobStatus::Processing);
    assert!(mid.progress > 0.0);

    manager.complete(&job_id, "PRD content".into());
    let done = manager.result(&job_id).unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.result.as_deref(), Some("PRD content"));

    manager.fail(&job_id, "ignored".into());
    assert_eq!(manager.status(&job_id), Some(JobStatus::Completed));
}

#[test]
fn unknown_job_queries_return_none() {
    let manager = JobManager::new();
    assert_eq!(manager.status("not-a-real-id"), None);
    assert!(manager.result("not-a-real-id").is_none());
}
