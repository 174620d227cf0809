//! Client subcommands: each connects to a running mock over IPC, makes one
//! or more calls and prints the result.
//!
//! Every command returns a process exit code: 0 on success, 1 when the call
//! failed, 3 when the server could not be reached.

use serde_json::{json, Value};

use super::client::{CliError, CliIpcClient};
use crate::ipc::SignalMessage;
use crate::sysupdate::{
    ObjectPath, JOB_INTERFACE, MANAGER_INTERFACE, PEER_INTERFACE, TARGET_INTERFACE,
    UPDATE_FLAG_OFFLINE,
};

fn report(error: &CliError) -> i32 {
    eprintln!("Error: {}", error);
    if matches!(error, CliError::Connect { .. }) {
        eprintln!("Is the mock running? Check SYSUPDATE_MOCK_SOCKET_PATH.");
    }
    error.exit_code()
}

async fn invoke(
    socket_path: &str,
    path: ObjectPath,
    interface: &str,
    member: &str,
    args: Vec<Value>,
) -> Result<Vec<Value>, i32> {
    let client = CliIpcClient::new(socket_path.to_string());
    client
        .call(path, interface, member, args)
        .await
        .map_err(|e| report(&e))
}

fn first(body: &[Value]) -> &Value {
    body.first().unwrap_or(&Value::Null)
}

/// `targets`: list update targets.
pub async fn run_targets(socket_path: &str) -> i32 {
    let reply = invoke(
        socket_path,
        ObjectPath::manager(),
        MANAGER_INTERFACE,
        "ListTargets",
        vec![],
    )
    .await;
    let body = match reply {
        Ok(body) => body,
        Err(code) => return code,
    };
    print!("{}", format_targets(first(&body)));
    0
}

/// `jobs`: list running jobs.
pub async fn run_jobs(socket_path: &str) -> i32 {
    let reply = invoke(
        socket_path,
        ObjectPath::manager(),
        MANAGER_INTERFACE,
        "ListJobs",
        vec![],
    )
    .await;
    let body = match reply {
        Ok(body) => body,
        Err(code) => return code,
    };
    print!("{}", format_jobs(first(&body)));
    0
}

/// `versions <target>`: list available versions.
pub async fn run_versions(socket_path: &str, target: &str) -> i32 {
    let reply = invoke(
        socket_path,
        ObjectPath::target(target),
        TARGET_INTERFACE,
        "List",
        vec![json!(false)],
    )
    .await;
    let body = match reply {
        Ok(body) => body,
        Err(code) => return code,
    };
    for version in first(&body).as_array().into_iter().flatten() {
        println!("{}", version.as_str().unwrap_or_default());
    }
    0
}

/// `describe <target> <version>`: print the version description document.
pub async fn run_describe(socket_path: &str, target: &str, version: &str) -> i32 {
    let args = vec![json!(version), json!(false)];
    let reply = invoke(
        socket_path,
        ObjectPath::target(target),
        TARGET_INTERFACE,
        "Describe",
        args,
    )
    .await;
    match reply {
        Ok(body) => {
            println!("{}", first(&body).as_str().unwrap_or_default());
            0
        }
        Err(code) => code,
    }
}

/// `check-new <target>`: print the newer version, if any.
pub async fn run_check_new(socket_path: &str, target: &str) -> i32 {
    let reply = invoke(
        socket_path,
        ObjectPath::target(target),
        TARGET_INTERFACE,
        "CheckNew",
        vec![],
    )
    .await;
    match reply {
        Ok(body) => {
            match first(&body).as_str().filter(|v| !v.is_empty()) {
                Some(version) => println!("{}", version),
                None => println!("No update available."),
            }
            0
        }
        Err(code) => code,
    }
}

/// `update <target> <version> [--offline] [--wait]`.
///
/// With `wait`, subscribes before starting the job and prints progress until
/// the job is removed.
pub async fn run_update(
    socket_path: &str,
    target: &str,
    version: &str,
    offline: bool,
    wait: bool,
) -> i32 {
    let client = CliIpcClient::new(socket_path.to_string());
    let mut connection = match client.connect().await {
        Ok(connection) => connection,
        Err(e) => return report(&e),
    };
    if wait {
        if let Err(e) = connection.subscribe().await {
            return report(&e);
        }
    }

    let flags = if offline { UPDATE_FLAG_OFFLINE } else { 0 };
    let args = vec![json!(version), json!(flags)];
    let body = match connection
        .call(ObjectPath::target(target), TARGET_INTERFACE, "Update", args)
        .await
    {
        Ok(body) => body,
        Err(e) => return report(&e),
    };

    let job_id = body.get(1).and_then(Value::as_u64).unwrap_or_default();
    let job_path = body.get(2).and_then(Value::as_str).unwrap_or_default().to_string();
    println!("Started job {} ({}) updating {} to {}", job_id, job_path, target, version);
    if !wait {
        return 0;
    }

    loop {
        let signal = match connection.next_signal().await {
            Ok(signal) => signal,
            Err(e) => return report(&e),
        };
        if let Some(progress) = progress_of(&signal, &job_path) {
            println!("{:>3}%", progress);
        }
        if removed_job(&signal) == Some(job_id) {
            println!("Job {} finished", job_id);
            return 0;
        }
    }
}

/// `cancel <job-id>`.
pub async fn run_cancel(socket_path: &str, job_id: u64) -> i32 {
    match invoke(socket_path, ObjectPath::job(job_id), JOB_INTERFACE, "Cancel", vec![]).await {
        Ok(_) => {
            println!("Cancelled job {}", job_id);
            0
        }
        Err(code) => code,
    }
}

/// `vacuum <target>`.
pub async fn run_vacuum(socket_path: &str, target: &str) -> i32 {
    let reply = invoke(
        socket_path,
        ObjectPath::target(target),
        TARGET_INTERFACE,
        "Vacuum",
        vec![],
    )
    .await;
    match reply {
        Ok(body) => {
            println!("Removed {} instance(s)", first(&body).as_u64().unwrap_or_default());
            0
        }
        Err(code) => code,
    }
}

/// `ping`.
pub async fn run_ping(socket_path: &str) -> i32 {
    match invoke(socket_path, ObjectPath::manager(), PEER_INTERFACE, "Ping", vec![]).await {
        Ok(_) => {
            println!("ok");
            0
        }
        Err(code) => code,
    }
}

/// `machine-id`.
pub async fn run_machine_id(socket_path: &str) -> i32 {
    match invoke(socket_path, ObjectPath::manager(), PEER_INTERFACE, "GetMachineId", vec![]).await {
        Ok(body) => {
            println!("{}", first(&body).as_str().unwrap_or_default());
            0
        }
        Err(code) => code,
    }
}

/// `monitor`: print every signal until the server goes away.
pub async fn run_monitor(socket_path: &str) -> i32 {
    let client = CliIpcClient::new(socket_path.to_string());
    let mut connection = match client.connect().await {
        Ok(connection) => connection,
        Err(e) => return report(&e),
    };
    if let Err(e) = connection.subscribe().await {
        return report(&e);
    }
    eprintln!("Monitoring signals on {} (Ctrl+C to stop)", socket_path);

    loop {
        match connection.next_signal().await {
            Ok(signal) => println!("{}", format_signal(&signal)),
            Err(CliError::Closed) => return 0,
            Err(e) => return report(&e),
        }
    }
}

fn format_targets(rows: &Value) -> String {
    let mut out = format!("{:<12} {:<20} {}\n", "CLASS", "NAME", "PATH");
    for row in rows.as_array().into_iter().flatten() {
        out.push_str(&format!(
            "{:<12} {:<20} {}\n",
            row[0].as_str().unwrap_or_default(),
            row[1].as_str().unwrap_or_default(),
            row[2].as_str().unwrap_or_default(),
        ));
    }
    out
}

fn format_jobs(rows: &Value) -> String {
    let rows: Vec<&Value> = rows.as_array().into_iter().flatten().collect();
    if rows.is_empty() {
        return "No jobs running.\n".to_string();
    }
    let mut out = format!("{:<16} {:<8} {:>8}  {}\n", "ID", "TYPE", "PROGRESS", "PATH");
    for row in rows {
        out.push_str(&format!(
            "{:<16} {:<8} {:>7}%  {}\n",
            row[0].as_u64().unwrap_or_default(),
            row[1].as_str().unwrap_or_default(),
            row[2].as_u64().unwrap_or_default(),
            row[3].as_str().unwrap_or_default(),
        ));
    }
    out
}

fn format_signal(signal: &SignalMessage) -> String {
    format!(
        "{} {}.{} {}",
        signal.path,
        signal.interface,
        signal.member,
        Value::Array(signal.body.clone())
    )
}

/// Progress carried by a PropertiesChanged signal for `job_path`.
fn progress_of(signal: &SignalMessage, job_path: &str) -> Option<u64> {
    if signal.member != "PropertiesChanged" || signal.path.as_str() != job_path {
        return None;
    }
    signal.body.get(1)?.get("Progress")?.get("value")?.as_u64()
}

fn removed_job(signal: &SignalMessage) -> Option<u64> {
    if signal.member != "JobRemoved" {
        return None;
    }
    signal.body.first()?.as_u64()
}
