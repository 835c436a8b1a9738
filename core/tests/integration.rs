//! End-to-end tests against the fake Planka server.
//!
//! # Design
//! Starts the mock server on a random port, logs in as the seeded demo user
//! and drives the client over real HTTP with the ureq transport. Checks that
//! request building, envelope decoding and relationship traversal agree with
//! what the server actually does.

use std::sync::Arc;

use planka_core::prelude::*;
use planka_core::{ApiError, UreqTransport};

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
    });

    format!("http://{addr}")
}

fn login() -> Planka {
    let url = start_server();
    let auth = PasswordAuth::new(mock_server::DEMO_USERNAME, mock_server::DEMO_PASSWORD);
    Planka::with_transport(&url, Arc::new(UreqTransport::default()), &auth).unwrap()
}

fn board(planka: &Planka) -> Board {
    let project = planka.create_project(args!("Demo")).unwrap();
    project.create_board(args!("Sprint 1")).unwrap()
}

#[test]
fn wrong_password_is_rejected() {
    let url = start_server();
    let err = Planka::with_transport(&url, Arc::new(UreqTransport::default()), &PasswordAuth::new("demo", "nope"))
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[test]
fn me_is_the_demo_user() {
    let planka = login();
    let me = planka.me().unwrap();
    assert_eq!(me.id(), Some(mock_server::DEMO_USER_ID));
    assert_eq!(me.username.as_deref(), Some(mock_server::DEMO_USERNAME));
}

#[test]
fn project_and_board_defaults() {
    let planka = login();
    let project = planka.create_project(args!("Demo")).unwrap();
    let background = project.background.value().unwrap();
    assert_eq!(background.kind, "gradient");

    let board = project.create_board(args!("Sprint 1")).unwrap();
    assert_eq!(board.position.value(), Some(&0));
    assert_eq!(project.boards().unwrap().len(), 1);
    assert_eq!(project.managers().unwrap().len(), 1);
    assert_eq!(planka.projects().unwrap().len(), 1);
}

#[test]
fn new_user_joins_board_as_editor() {
    let planka = login();
    let board = board(&planka);
    let ann = planka.create_user(args!("ann", "ann@x.io", "S3cure-enough!")).unwrap();
    assert_eq!(ann.name.as_deref(), Some("ann"));

    let membership = board.add_user(&ann, args!(role = "editor")).unwrap();
    assert_eq!(membership.can_comment.value(), Some(&true));
    let editors: Vec<String> = board
        .editors()
        .unwrap()
        .iter()
        .filter_map(|u| u.id().map(str::to_string))
        .collect();
    assert!(editors.iter().any(|id| Some(id.as_str()) == ann.id()));
}

#[test]
fn duplicate_and_weak_users_are_validation_errors() {
    let planka = login();
    let err = planka
        .create_user(args!("demo", "other@x.io", "S3cure-enough!"))
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    let err = planka.create_user(args!("bob", "bob@x.io", "123")).unwrap_err();
    assert!(matches!(err, ApiError::Validation(ref m) if m.contains("password")));
}

#[test]
fn invalid_label_color_never_reaches_the_server() {
    let planka = login();
    let board = board(&planka);
    let err = board.create_label(args!("bug", color = "plaid")).unwrap_err();
    assert!(matches!(err, ApiError::InvalidValue { field: "color", .. }));
    assert!(board.labels().unwrap().is_empty());

    let label = board.create_label(args!("bug", color = "berry-red")).unwrap();
    assert_eq!(label.color.as_deref(), Some("berry-red"));
}

#[test]
fn card_lifecycle() {
    let planka = login();
    let board = board(&planka);
    let todo = board.create_list(args!("Todo")).unwrap();
    let done = board.create_list(args!("Done", position = 65535)).unwrap();

    let mut card = todo.create_card(args!("Write notes")).unwrap();
    card.editor(|c| {
        c.description.set("first draft");
        Ok(())
    })
    .unwrap();
    let fresh = planka.card(card.id().unwrap()).unwrap();
    assert_eq!(fresh.description.as_deref(), Some("first draft"));

    let label = board.create_label(args!("docs")).unwrap();
    card.add_label(&label).unwrap();
    assert_eq!(card.labels().unwrap().len(), 1);

    card.move_to(&done).unwrap();
    assert!(todo.cards().unwrap().is_empty());
    assert_eq!(done.cards().unwrap().len(), 1);

    let task = card.add_task(args!("proofread")).unwrap();
    assert_eq!(task.is_completed.value(), Some(&false));
    assert_eq!(card.tasks().unwrap().len(), 1);

    let id = card.id().unwrap().to_string();
    card.delete().unwrap();
    let err = planka.card(&id).unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
}

#[test]
fn sorting_a_list_by_name() {
    let planka = login();
    let board = board(&planka);
    let list = board.create_list(args!("Backlog")).unwrap();
    for name in ["zeta", "alpha", "mid"] {
        list.create_card(args!(name)).unwrap();
    }
    list.sort_by_name().unwrap();

    let mut cards = list.cards().unwrap();
    cards.sort_by_key(|c| c.position.value().copied().unwrap_or_default());
    let names: Vec<&str> = cards.iter().filter_map(|c| c.name.as_deref()).collect();
    assert_eq!(names, ["alpha", "mid", "zeta"]);
}

#[test]
fn comments_and_notifications() {
    let planka = login();
    let board = board(&planka);
    let list = board.create_list(args!("Todo")).unwrap();
    let card = list.create_card(args!("Discuss")).unwrap();

    let mut comment = card.add_comment("first!").unwrap();
    assert!(comment.is_comment());
    comment.set_text("edited").unwrap();
    let comments = card.comments().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text(), Some("edited"));

    // The author is not notified about their own comment.
    assert!(planka.notifications().unwrap().is_empty());

    card.remove_comment(&comment).unwrap();
    assert!(card.comments().unwrap().is_empty());
}

#[test]
fn stopwatch_round_trip() {
    let planka = login();
    let board = board(&planka);
    let list = board.create_list(args!("Doing")).unwrap();
    let mut card = list.create_card(args!("Timed")).unwrap();
    card.add_stopwatch().unwrap();

    let mut stopwatch = card.get_stopwatch();
    stopwatch.start().unwrap();
    assert!(stopwatch.is_running());
    stopwatch.stop().unwrap();
    assert!(!stopwatch.is_running());
    stopwatch.set(1, 2, 3).unwrap();
    assert_eq!(stopwatch.total(), 3723);

    let fresh = planka.card(card.id().unwrap()).unwrap();
    assert_eq!(fresh.stopwatch().map(|s| s.total), Some(3723));

    card.remove_stopwatch().unwrap();
    assert!(planka.card(card.id().unwrap()).unwrap().stopwatch().is_none());
}

#[test]
fn attachment_download_returns_uploaded_bytes() {
    let planka = login();
    let board = board(&planka);
    let list = board.create_list(args!("Files")).unwrap();
    let card = list.create_card(args!("With file")).unwrap();

    let attachment = card.add_attachment("notes.txt", b"hello planka").unwrap();
    assert_eq!(attachment.name.as_deref(), Some("notes.txt"));
    assert_eq!(attachment.download().unwrap(), b"hello planka");
    assert_eq!(card.attachments().unwrap().len(), 1);
}

#[test]
fn logout_invalidates_the_token() {
    let planka = login();
    let copy = planka.clone();
    planka.logout().unwrap();
    let err = copy.me().unwrap_err();
    assert_eq!(err.status(), Some(401));
}
