mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use common::{TestApp, TestSession};
use portal_auth::services::email::EmailKind;
use portal_auth::store::AuthStore;

async fn invite(
    app: &TestApp,
    session: &TestSession,
    email: &str,
    role: &str,
) -> (StatusCode, Value) {
    app.request(
        Method::POST,
        &format!("/api/organizations/{}/invitations", session.organization_id()),
        Some(json!({ "email": email, "role": role })),
        Some(session),
    )
    .await
}

async fn accept(app: &TestApp, token: &str, body: Value) -> (StatusCode, Value) {
    app.request(
        Method::POST,
        &format!("/api/invitations/{token}/accept"),
        Some(body),
        None,
    )
    .await
}

#[tokio::test]
async fn accept_grants_the_invited_role_and_ignores_payload_role() {
    let app = TestApp::new();
    let owner = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    let (status, body) = invite(&app, &owner, "bob@acme.test", "trustee").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["role"], "trustee");
    assert_eq!(body["status"], "pending");

    let token = app.emailed_token(EmailKind::Invitation).await;

    // The payload tries to smuggle in a higher role; only the stored
    // invitation row decides.
    let (status, body) = accept(
        &app,
        &token,
        json!({
            "password": "B0bStrongPass",
            "firstName": "Bob",
            "lastName": "Jones",
            "role": "admin",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["role"], "trustee");
    assert_eq!(body["organization"]["slug"], "acme");
    // Invitation acceptance proves control of the mailbox.
    assert_eq!(body["user"]["emailVerified"], true);

    let org_id = Uuid::parse_str(&owner.organization_id()).unwrap();
    let user_id = Uuid::parse_str(body["user"]["id"].as_str().unwrap()).unwrap();
    let membership = app
        .store
        .find_membership(org_id, user_id)
        .await
        .unwrap()
        .expect("membership");
    assert!(membership.is_active);
    assert_eq!(membership.role.as_str(), "trustee");
}

#[tokio::test]
async fn preview_shows_the_invitation_without_authentication() {
    let app = TestApp::new();
    let owner = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;
    invite(&app, &owner, "bob@acme.test", "secretary").await;
    let token = app.emailed_token(EmailKind::Invitation).await;

    let (status, body) = app
        .request(Method::GET, &format!("/api/invitations/{token}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["organizationName"], "Acme Trust");
    assert_eq!(body["email"], "bob@acme.test");
    assert_eq!(body["role"], "secretary");
    assert_eq!(body["existingUser"], false);
}

#[tokio::test]
async fn first_time_accept_requires_a_password() {
    let app = TestApp::new();
    let owner = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;
    invite(&app, &owner, "bob@acme.test", "trustee").await;
    let token = app.emailed_token(EmailKind::Invitation).await;

    let (status, _) = accept(&app, &token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn members_without_invite_permission_are_denied() {
    let app = TestApp::new();
    let owner = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;
    invite(&app, &owner, "carol@acme.test", "viewer").await;
    let token = app.emailed_token(EmailKind::Invitation).await;
    let (status, body) = accept(&app, &token, json!({ "password": "C4rolStrong" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let carol = TestSession::from_body(&body);

    let (status, body) = invite(&app, &carol, "dave@acme.test", "viewer").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INSUFFICIENT_PERMISSIONS");
}

#[tokio::test]
async fn inviter_cannot_grant_at_or_above_their_own_level() {
    let app = TestApp::new();
    let owner = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;
    invite(&app, &owner, "bob@acme.test", "admin").await;
    let token = app.emailed_token(EmailKind::Invitation).await;
    let (_, body) = accept(&app, &token, json!({ "password": "B0bStrongPass" })).await;
    let admin = TestSession::from_body(&body);

    // Same level as the inviter.
    let (status, body) = invite(&app, &admin, "eve@acme.test", "admin").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INSUFFICIENT_ROLE");

    // Owner is never invitable, even by an owner.
    let (status, body) = invite(&app, &owner, "eve@acme.test", "owner").await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    // Strictly below the inviter works.
    let (status, _) = invite(&app, &admin, "eve@acme.test", "chair").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn cancelled_invitations_cannot_be_accepted() {
    let app = TestApp::new();
    let owner = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;
    let (_, created) = invite(&app, &owner, "bob@acme.test", "trustee").await;
    let token = app.emailed_token(EmailKind::Invitation).await;

    let (status, body) = app
        .request(
            Method::DELETE,
            &format!(
                "/api/organizations/{}/invitations/{}",
                owner.organization_id(),
                created["id"].as_str().unwrap()
            ),
            None,
            Some(&owner),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "cancelled");

    let (status, body) = accept(&app, &token, json!({ "password": "B0bStrongPass" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INVITATION");
}

#[tokio::test]
async fn expired_invitations_cannot_be_accepted() {
    let app = TestApp::new();
    let owner = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;
    invite(&app, &owner, "bob@acme.test", "trustee").await;
    let token = app.emailed_token(EmailKind::Invitation).await;

    // Force the expiry into the past.
    let org_id = Uuid::parse_str(&owner.organization_id()).unwrap();
    let mut invitation = app
        .store
        .find_pending_invitation(org_id, "bob@acme.test")
        .await
        .unwrap()
        .expect("pending invitation");
    invitation.expires_at = chrono::Utc::now() - chrono::Duration::minutes(1);
    app.store.update_invitation(&invitation).await.unwrap();

    let (status, body) = accept(&app, &token, json!({ "password": "B0bStrongPass" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INVITATION");
}

#[tokio::test]
async fn reinviting_a_pending_email_resends_against_the_same_row() {
    let app = TestApp::new();
    let owner = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    let (_, first) = invite(&app, &owner, "bob@acme.test", "trustee").await;
    let first_token = app.emailed_token(EmailKind::Invitation).await;

    let (status, second) = invite(&app, &owner, "bob@acme.test", "secretary").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["id"], second["id"]);
    assert_eq!(second["role"], "secretary");

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/organizations/{}/invitations", owner.organization_id()),
            None,
            Some(&owner),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // The resend replaced the token.
    let (status, _) = accept(&app, &first_token, json!({ "password": "B0bStrongPass" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let second_token = app.emailed_token(EmailKind::Invitation).await;
    let (status, body) = accept(&app, &second_token, json!({ "password": "B0bStrongPass" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["role"], "secretary");
}

#[tokio::test]
async fn inviting_an_active_member_conflicts() {
    let app = TestApp::new();
    let owner = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    let (status, body) = invite(&app, &owner, "alice@acme.test", "trustee").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_MEMBER");
}

#[tokio::test]
async fn member_limit_blocks_new_invitations() {
    let app = TestApp::new();
    let owner = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;

    let org_id = Uuid::parse_str(&owner.organization_id()).unwrap();
    let mut org = app
        .store
        .find_organization_by_id(org_id)
        .await
        .unwrap()
        .unwrap();
    org.member_limit = 1;
    app.store.insert_organization(&org).await.unwrap();

    let (status, body) = invite(&app, &owner, "bob@acme.test", "trustee").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "MEMBER_LIMIT_REACHED");
}

#[tokio::test]
async fn cross_tenant_invitation_management_is_denied() {
    let app = TestApp::new();
    let acme = app
        .register("Acme Trust", "acme", "alice@acme.test", "Str0ngPass1")
        .await;
    let other = app
        .register("Other Org", "other", "olivia@other.test", "Str0ngPass1")
        .await;

    // Olivia tries to invite into Acme's organization.
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/organizations/{}/invitations", acme.organization_id()),
            Some(json!({ "email": "mallory@other.test", "role": "trustee" })),
            Some(&other),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NOT_ORG_MEMBER");
}
