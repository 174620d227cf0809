//! Manager behaviour with more than one target.

use std::time::Duration;

use sysupdate_mock::sysupdate::{
    Manager, ObjectPath, SimulationConfig, TargetConfig, TargetError, DEFAULT_APPSTREAM_URL,
};

fn extension() -> TargetConfig {
    TargetConfig {
        name: "devel".to_string(),
        class: "sysext".to_string(),
        current_version: "0.9".to_string(),
        available_versions: vec!["0.9".to_string(), "1.0".to_string()],
        appstream_urls: vec![
            DEFAULT_APPSTREAM_URL.to_string(),
            "https://example.org/devel.metainfo.xml".to_string(),
        ],
    }
}

fn manager() -> Manager {
    Manager::new(vec![TargetConfig::os(), extension()], SimulationConfig::default()).unwrap()
}

#[tokio::test]
async fn test_targets_listed_in_order() {
    let manager = manager();
    let names: Vec<String> = manager.list_targets().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["os", "devel"]);
    assert_eq!(manager.target("devel").unwrap().path(), &ObjectPath::target("devel"));
}

#[tokio::test]
async fn test_appstream_urls_deduplicated() {
    let manager = manager();
    assert_eq!(
        manager.list_appstream(),
        vec![
            DEFAULT_APPSTREAM_URL.to_string(),
            "https://example.org/devel.metainfo.xml".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_jobs_share_one_registry() {
    let manager = manager();
    let os_job = manager.target("os").unwrap().update("2.0.0", 0);
    let devel_job = manager.target("devel").unwrap().update("1.0", 0);

    let ids: Vec<u64> = manager.list_jobs().iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![os_job.job_id, devel_job.job_id]);

    assert!(manager.remove_job(os_job.job_id, 0));
    assert!(!manager.remove_job(os_job.job_id, 0));
    assert_eq!(manager.list_jobs().len(), 1);

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(manager.list_jobs().is_empty());
}

#[tokio::test]
async fn test_invalid_configurations_rejected() {
    let targets = vec![TargetConfig::os(), TargetConfig::os()];
    let err = Manager::new(targets, SimulationConfig::default()).unwrap_err();
    assert_eq!(err, TargetError::Duplicate("os".to_string()));

    let mut bad = extension();
    bad.name = "a/b".to_string();
    let err = Manager::new(vec![bad], SimulationConfig::default()).unwrap_err();
    assert!(matches!(err, TargetError::InvalidName(_)));
}
