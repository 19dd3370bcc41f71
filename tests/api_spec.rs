use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::json;
use taskboard::api::{create_router, create_router_with_config};
use taskboard::config::ServerConfig;
use taskboard::db::Database;
use taskboard::models::*;

fn test_db() -> Database {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    db
}

fn setup() -> TestServer {
    TestServer::new(create_router(test_db())).expect("Failed to create test server")
}

async fn create_test_project(server: &TestServer, name: &str) -> Project {
    server
        .post("/api/projects")
        .json(&CreateProjectInput {
            name: name.to_string(),
            color: None,
            default_duration_minutes: None,
        })
        .await
        .json::<Project>()
}

async fn create_test_task(
    server: &TestServer,
    content: &str,
    task_date: Option<&str>,
    project_id: Option<ProjectId>,
) -> Task {
    server
        .post("/api/tasks")
        .json(&json!({
            "content": content,
            "task_date": task_date,
            "project_id": project_id,
        }))
        .await
        .json::<Task>()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();
        let response = server.get("/api/health").await;
        response.assert_status_ok();
        response.assert_json(&json!({ "status": "ok" }));
    }
}

mod tasks {
    use super::*;

    #[tokio::test]
    async fn create_returns_201_with_defaults() {
        let server = setup();

        let response = server
            .post("/api/tasks")
            .json(&json!({ "content": "  buy milk  ", "task_date": "2024-05-01" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let task: Task = response.json();
        assert_eq!(task.content, "buy milk");
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.is_completed);
    }

    #[tokio::test]
    async fn create_rejects_blank_content() {
        let server = setup();
        let response = server
            .post("/api/tasks")
            .json(&json!({ "content": "   " }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_rejects_unknown_project() {
        let server = setup();
        let response = server
            .post("/api/tasks")
            .json(&json!({ "content": "dig", "project_id": 99 }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn lists_by_date_and_inbox() {
        let server = setup();
        let project = create_test_project(&server, "Garden").await;
        create_test_task(&server, "today", Some("2024-05-01"), None).await;
        create_test_task(&server, "other day", Some("2024-05-02"), None).await;
        create_test_task(&server, "loose", None, None).await;
        create_test_task(&server, "dig", None, Some(project.id)).await;

        let dated: Vec<Task> = server.get("/api/tasks/2024-05-01").await.json();
        assert_eq!(dated.len(), 1);
        assert_eq!(dated[0].content, "today");

        let inbox: Vec<Task> = server.get("/api/tasks/inbox").await.json();
        let contents: Vec<&str> = inbox.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["loose", "dig"]);
    }

    #[tokio::test]
    async fn rejects_malformed_date() {
        let server = setup();
        let response = server.get("/api/tasks/yesterday").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_moves_task_to_backlog() {
        let server = setup();
        let project = create_test_project(&server, "Garden").await;
        let task = create_test_task(&server, "dig", Some("2024-05-01"), None).await;

        let response = server
            .put(&format!("/api/tasks/{}", task.id))
            .json(&UpdateTaskInput {
                content: task.content.clone(),
                task_date: None,
                project_id: Some(project.id),
                priority: None,
            })
            .await;

        response.assert_status_ok();
        let updated: Task = response.json();
        assert!(updated.task_date.is_none());
        assert_eq!(updated.project_id, Some(project.id));

        let dated: Vec<Task> = server.get("/api/tasks/2024-05-01").await.json();
        assert!(dated.is_empty());
    }

    #[tokio::test]
    async fn update_missing_task_is_404() {
        let server = setup();
        let response = server
            .put("/api/tasks/42")
            .json(&json!({ "content": "x" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn toggle_flips_completion() {
        let server = setup();
        let task = create_test_task(&server, "dig", None, None).await;

        let done: Task = server
            .put(&format!("/api/tasks/{}/toggle", task.id))
            .await
            .json();
        assert!(done.is_completed);
        assert!(done.completed_at.is_some());

        let reopened: Task = server
            .put(&format!("/api/tasks/{}/toggle", task.id))
            .await
            .json();
        assert!(!reopened.is_completed);
    }

    #[tokio::test]
    async fn delete_returns_204_then_404() {
        let server = setup();
        let task = create_test_task(&server, "dig", None, None).await;

        server
            .delete(&format!("/api/tasks/{}", task.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&format!("/api/tasks/{}", task.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod projects {
    use super::*;

    #[tokio::test]
    async fn create_returns_201() {
        let server = setup();
        let response = server
            .post("/api/projects")
            .json(&json!({ "name": "Garden", "color": "#00ff00" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let project: Project = response.json();
        assert_eq!(project.name, "Garden");
        assert_eq!(project.color, "#00ff00");
        assert_eq!(project.default_duration_minutes, DEFAULT_DURATION_MINUTES);
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let server = setup();
        let response = server
            .post("/api/projects")
            .json(&json!({ "name": " " }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_includes_stats() {
        let server = setup();
        let project = create_test_project(&server, "Garden").await;
        let task = create_test_task(&server, "dig", None, Some(project.id)).await;
        create_test_task(&server, "plant", None, Some(project.id)).await;
        server.put(&format!("/api/tasks/{}/toggle", task.id)).await;

        let projects: Vec<Project> = server.get("/api/projects").await.json();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].stats.progress_percent, 50);
        assert!(!projects[0].stats.is_rusting);
    }
}

mod brain_dump {
    use super::*;

    #[tokio::test]
    async fn splits_text_into_tasks_for_the_day() {
        let server = setup();

        let response = server
            .post("/api/ai/process-braindump")
            .json(&json!({
                "text": "buy milk; call bank\n- book dentist",
                "task_date": "2024-05-01",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let created: Vec<Task> = response.json();
        assert_eq!(created.len(), 3);

        let dated: Vec<Task> = server.get("/api/tasks/2024-05-01").await.json();
        let contents: Vec<&str> = dated.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["buy milk", "call bank", "book dentist"]);
    }

    #[tokio::test]
    async fn rejects_blank_text() {
        let server = setup();
        let response = server
            .post("/api/ai/process-braindump")
            .json(&json!({ "text": "  ", "task_date": "2024-05-01" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

mod auth {
    use super::*;

    fn secured() -> TestServer {
        let config = ServerConfig {
            api_key: Some("secret".to_string()),
            ..ServerConfig::default()
        };
        TestServer::new(create_router_with_config(test_db(), &config))
            .expect("Failed to create test server")
    }

    #[tokio::test]
    async fn health_needs_no_key() {
        secured().get("/api/health").await.assert_status_ok();
    }

    #[tokio::test]
    async fn missing_key_is_401() {
        secured()
            .get("/api/tasks/inbox")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn matching_key_is_accepted() {
        secured()
            .get("/api/tasks/inbox")
            .authorization_bearer("secret")
            .await
            .assert_status_ok();
    }
}
