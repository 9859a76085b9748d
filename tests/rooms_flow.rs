mod common;

use axum::http::StatusCode;
use common::{invite_token, location, text, Client, TestApp};
use serde_json::Value;

/// Creates a room through the dashboard form and returns its id and invite token.
async fn create_room(client: &mut Client<'_>, name: &str, access_key: &str) -> (String, String) {
    let res = client.post_form("/rooms", &[("name", name), ("access_key", access_key)]).await;
    assert_eq!(location(&res), "/dashboard");

    let dashboard = client.page("/dashboard").await;
    assert!(dashboard.contains("Room created."), "{dashboard}");
    let token = invite_token(&dashboard);

    let rooms = client.get_json("/api/rooms").await;
    let room = rooms
        .as_array()
        .unwrap()
        .iter()
        .find(|room| room["name"] == name)
        .expect("room missing from listing");
    (room["id"].as_str().unwrap().to_owned(), token)
}

fn task_ids(tasks: &Value) -> Vec<String> {
    tasks.as_array().unwrap().iter().map(|t| t["id"].as_str().unwrap().to_owned()).collect()
}

#[tokio::test]
async fn owner_creates_a_room_and_sees_it_listed() {
    let app = TestApp::new().await;
    let mut owner = app.user("owner@example.com").await;

    let (room_id, token) = create_room(&mut owner, "Flat 3B", "").await;
    assert_eq!(token.len(), 32);

    let dashboard = owner.page("/dashboard").await;
    assert!(dashboard.contains("Flat 3B"));
    assert!(dashboard.contains(&format!("/rooms/{room_id}")));
    assert!(dashboard.contains("Owner"));

    let room = owner.page(&format!("/rooms/{room_id}")).await;
    assert!(room.contains("Flat 3B"));
    assert!(room.contains(&format!("/invite/{token}")));
    assert!(room.contains(&format!("/rooms/{room_id}/randomize")));
}

#[tokio::test]
async fn blank_room_names_are_refused() {
    let app = TestApp::new().await;
    let mut owner = app.user("owner@example.com").await;

    let res = owner.post_form("/rooms", &[("name", "   ")]).await;
    assert_eq!(location(&res), "/dashboard");
    let dashboard = owner.page("/dashboard").await;
    assert!(dashboard.contains("Room name is required."));
    assert!(dashboard.contains("No rooms yet."));
}

#[tokio::test]
async fn invite_link_brings_a_new_member_in_after_login() {
    let app = TestApp::new().await;
    let mut owner = app.user("owner@example.com").await;
    let (room_id, token) = create_room(&mut owner, "Cabin", "").await;
    app.user("guest@example.com").await;

    let mut guest = app.client();
    let res = guest.get(&format!("/invite/{token}")).await;
    assert_eq!(location(&res), "/login");

    let res = guest
        .post_form("/login", &[("email", "guest@example.com"), ("password", "hunter22")])
        .await;
    assert_eq!(location(&res), format!("/invite/{token}"));

    let res = guest.get(&format!("/invite/{token}")).await;
    assert_eq!(location(&res), format!("/rooms/{room_id}"));

    let room = guest.page(&format!("/rooms/{room_id}")).await;
    assert!(room.contains("Cabin"));
    assert!(room.contains("guest@example.com"));
    assert!(!room.contains(&format!("/rooms/{room_id}/randomize")));

    // Joining twice is harmless.
    let res = guest.get(&format!("/invite/{token}")).await;
    assert_eq!(location(&res), format!("/rooms/{room_id}"));
    let members = guest.get_json(&format!("/api/rooms/{room_id}/members")).await;
    assert_eq!(members.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn bad_invite_tokens_render_an_error_page() {
    let app = TestApp::new().await;
    let mut user = app.user("someone@example.com").await;

    let res = user.get("/invite/doesnotexist").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(text(res).await.contains("Invalid or expired invite link"));
}

#[tokio::test]
async fn rotating_the_invite_retires_the_old_link() {
    let app = TestApp::new().await;
    let mut owner = app.user("owner@example.com").await;
    let (room_id, old_token) = create_room(&mut owner, "Loft", "").await;

    let res = owner.post_form(&format!("/rooms/{room_id}/invite/rotate"), &[]).await;
    assert_eq!(location(&res), format!("/rooms/{room_id}"));
    let room = owner.page(&format!("/rooms/{room_id}")).await;
    assert!(room.contains("Invite link replaced."));
    assert!(!room.contains(&old_token));

    let mut late = app.user("late@example.com").await;
    let res = late.get(&format!("/invite/{old_token}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn access_keys_let_people_join() {
    let app = TestApp::new().await;
    let mut owner = app.user("owner@example.com").await;
    let (room_id, _) = create_room(&mut owner, "Dorm", "open-sesame").await;

    let mut other = app.user("other@example.com").await;
    let res = other.post_form("/rooms", &[("name", "Copycat"), ("access_key", "open-sesame")]).await;
    assert_eq!(location(&res), "/dashboard");
    assert!(other.page("/dashboard").await.contains("That access key is already used by another room."));

    let res = other.post_form("/rooms/join", &[("access_key", "wrong")]).await;
    assert_eq!(location(&res), "/dashboard");
    assert!(other.page("/dashboard").await.contains("Invalid access key"));

    let res = other.post_form("/rooms/join", &[("access_key", "open-sesame")]).await;
    assert_eq!(location(&res), format!("/rooms/{room_id}"));
    assert!(other.page(&format!("/rooms/{room_id}")).await.contains("Joined."));
}

#[tokio::test]
async fn outsiders_cannot_see_a_room() {
    let app = TestApp::new().await;
    let mut owner = app.user("owner@example.com").await;
    let (room_id, _) = create_room(&mut owner, "Private", "").await;

    let mut outsider = app.user("outsider@example.com").await;
    let res = outsider.get(&format!("/rooms/{room_id}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(!text(res).await.contains("Private"));

    let res = app.client().get(&format!("/rooms/{room_id}")).await;
    assert_eq!(location(&res), "/login");

    let res = outsider.get("/rooms/not-a-uuid").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(text(res).await.contains("Nothing here"));
}

#[tokio::test]
async fn members_add_and_finish_chores_but_only_the_owner_assigns() {
    let app = TestApp::new().await;
    let mut owner = app.user("owner@example.com").await;
    let (room_id, token) = create_room(&mut owner, "House", "").await;
    let mut member = app.user("member@example.com").await;
    member.get(&format!("/invite/{token}")).await;
    let room_path = format!("/rooms/{room_id}");

    let res = member
        .post_form(&format!("{room_path}/tasks"), &[("title", "Take out <trash>"), ("difficulty", "2")])
        .await;
    assert_eq!(location(&res), room_path);
    let room = member.page(&room_path).await;
    assert!(room.contains("Task added."));
    assert!(room.contains("Take out &lt;trash&gt;"));
    assert!(room.contains("Difficulty: 2/5"));

    member
        .post_form(&format!("{room_path}/tasks"), &[("title", "Mop"), ("difficulty", "9")])
        .await;
    assert!(member.page(&room_path).await.contains("Difficulty must be between 1 and 5."));

    member.post_form(&format!("{room_path}/randomize"), &[]).await;
    assert!(member.page(&room_path).await.contains("Only the room owner can do that."));

    let tasks = member.get_json(&format!("/api/rooms/{room_id}/tasks")).await;
    let ids = task_ids(&tasks);
    assert_eq!(ids.len(), 1);
    let task_path = format!("{room_path}/tasks/{}", ids[0]);

    member.post_form(&format!("{task_path}/assign"), &[("assignee", "")]).await;
    assert!(member.page(&room_path).await.contains("Only the room owner can do that."));

    let res = member.post_form(&format!("{task_path}/done"), &[("done", "true")]).await;
    assert_eq!(location(&res), room_path);
    let tasks = owner.get_json(&format!("/api/rooms/{room_id}/tasks")).await;
    assert_eq!(tasks[0]["is_done"], true);
    assert!(owner.page(&room_path).await.contains("Mark undone"));
}

#[tokio::test]
async fn owner_randomizes_and_assigns_open_chores() {
    let app = TestApp::new().await;
    let mut owner = app.user("owner@example.com").await;
    let (room_id, token) = create_room(&mut owner, "Studio", "").await;
    let mut member = app.user("member@example.com").await;
    member.get(&format!("/invite/{token}")).await;
    let room_path = format!("/rooms/{room_id}");

    for (title, difficulty) in [("Dishes", "3"), ("Vacuum", "4"), ("Plants", "1")] {
        owner
            .post_form(&format!("{room_path}/tasks"), &[("title", title), ("difficulty", difficulty)])
            .await;
    }

    let res = owner.post_form(&format!("{room_path}/randomize"), &[]).await;
    assert_eq!(location(&res), room_path);
    assert!(owner.page(&room_path).await.contains("Randomized assignments for 3 task(s)."));

    let tasks = owner.get_json(&format!("/api/rooms/{room_id}/tasks")).await;
    assert!(tasks.as_array().unwrap().iter().all(|t| t["assignee_id"].is_string()));

    let members = owner.get_json(&format!("/api/rooms/{room_id}/members")).await;
    let member_id = members
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["email"] == "member@example.com")
        .unwrap()["user_id"]
        .as_str()
        .unwrap()
        .to_owned();

    let task_id = tasks[0]["id"].as_str().unwrap();
    let res = owner
        .post_form(&format!("{room_path}/tasks/{task_id}/assign"), &[("assignee", member_id.as_str())])
        .await;
    assert_eq!(location(&res), room_path);
    assert!(owner.page(&room_path).await.contains("Assigned."));

    let room = member.page(&room_path).await;
    assert!(!room.contains("Nothing assigned to you."));

    owner
        .post_form(&format!("{room_path}/tasks/{task_id}/assign"), &[("assignee", "")])
        .await;
    assert!(owner.page(&room_path).await.contains("Unassigned."));
}
