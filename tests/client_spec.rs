use chrono::NaiveDate;
use taskboard::api::{create_router, create_router_with_config};
use taskboard::board::*;
use taskboard::client::{RemoteError, TaskStore, TaskStoreClient};
use taskboard::config::ServerConfig;
use taskboard::db::Database;
use taskboard::models::*;

fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid date")
}

fn test_db() -> Database {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    db
}

/// Serve `app` on an ephemeral port and return its API base URL.
async fn spawn(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });
    format!("http://{}/api", addr)
}

async fn client() -> TaskStoreClient {
    TaskStoreClient::new(spawn(create_router(test_db())).await, None)
}

#[tokio::test]
async fn round_trips_tasks_and_projects() {
    let client = client().await;

    let project = client
        .create_project(&CreateProjectInput {
            name: "Garden".to_string(),
            color: None,
            default_duration_minutes: None,
        })
        .await
        .expect("create project");
    let task = client
        .create_task(&CreateTaskInput {
            content: "dig".to_string(),
            task_date: Some(date("2024-05-01")),
            project_id: Some(project.id),
            priority: Some(Priority::High),
        })
        .await
        .expect("create task");

    let dated = client
        .tasks_for_date(date("2024-05-01"))
        .await
        .expect("list dated");
    assert_eq!(dated, vec![task.clone()]);

    let moved = client
        .update_task(task.id, &UpdateTaskInput::relocate(&task, Placement::backlog(None)))
        .await
        .expect("update");
    assert_eq!(moved.placement(), Placement::backlog(None));
    assert_eq!(moved.priority, Priority::High);

    let inbox = client.inbox_tasks().await.expect("list inbox");
    assert_eq!(inbox.len(), 1);

    let projects = client.projects().await.expect("list projects");
    assert_eq!(projects[0].name, "Garden");
}

#[tokio::test]
async fn missing_task_is_a_status_error() {
    let client = client().await;

    let err = client.toggle_task(TaskId(42)).await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    let err = client.delete_task(TaskId(42)).await.unwrap_err();
    assert!(matches!(err, RemoteError::Status { status: 404, .. }));
}

#[tokio::test]
async fn unauthorized_is_session_expired() {
    let config = ServerConfig {
        api_key: Some("secret".to_string()),
        ..ServerConfig::default()
    };
    let url = spawn(create_router_with_config(test_db(), &config)).await;

    let anonymous = TaskStoreClient::new(url.clone(), None);
    assert!(matches!(
        anonymous.inbox_tasks().await,
        Err(RemoteError::SessionExpired)
    ));

    let authorized = TaskStoreClient::new(url, Some("secret".to_string()));
    assert!(authorized.inbox_tasks().await.is_ok());

    let mut board = Board::new(anonymous, date("2024-05-01"));
    assert_eq!(board.reload().await, Err(BoardError::SessionExpired));
}

#[tokio::test]
async fn board_drives_the_server_end_to_end() {
    let client = client().await;
    let project = client
        .create_project(&CreateProjectInput {
            name: "Garden".to_string(),
            color: None,
            default_duration_minutes: None,
        })
        .await
        .expect("create project");

    let mut board = Board::new(client, date("2024-05-01"));
    assert_eq!(board.reload().await, Ok(true));

    board.set_brain_dump_text("buy seeds; dig beds");
    assert_eq!(board.submit_brain_dump().await, Ok(Outcome::Applied));
    let today: Vec<TaskId> = board.state().registry().today().iter().map(|t| t.id).collect();
    assert_eq!(today.len(), 2);

    let target = format!("inbox-{}", project.id);
    let outcome = board.drop_raw("today", &target, today[1]).await;
    assert_eq!(outcome, Ok(Outcome::Applied));
    assert_eq!(
        board.state().registry().project_backlog(project.id).len(),
        1
    );

    assert_eq!(board.toggle_task(today[0]).await, Ok(Outcome::Applied));
    let stats = &board.state().projects()[0].stats;
    assert_eq!(stats.progress_percent, 0);
    assert!(stats.is_rusting);

    assert_eq!(
        board.delete_task(today[0], |_| true).await,
        Ok(Outcome::Applied)
    );
    assert!(board.state().registry().today().is_empty());
}
