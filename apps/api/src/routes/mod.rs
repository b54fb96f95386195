pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::auth::handlers as auth;
use crate::jobs::handlers as jobs;
use crate::matching::handlers as ai;
use crate::messaging::handlers as messages;
use crate::networking::handlers as connections;
use crate::payments::handlers as payments;
use crate::posts::handlers as posts;
use crate::state::AppState;
use crate::users::handlers as users;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/register", post(auth::handle_register))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/auth/me", get(auth::handle_me))
        .route("/api/v1/auth/profile", put(auth::handle_update_profile))
        // Users
        .route("/api/v1/users/search", get(users::handle_search_users))
        .route("/api/v1/users/:id", get(users::handle_get_user))
        // Jobs
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/mine", get(jobs::handle_my_jobs))
        .route(
            "/api/v1/jobs/mine/applications",
            get(jobs::handle_my_applications),
        )
        .route("/api/v1/jobs/applied", get(jobs::handle_applied_jobs))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route(
            "/api/v1/jobs/:id/apply",
            post(jobs::handle_apply).delete(jobs::handle_cancel_application),
        )
        .route(
            "/api/v1/jobs/:id/applications/:app_id",
            put(jobs::handle_set_application_status),
        )
        // Connections
        .route(
            "/api/v1/connections",
            get(connections::handle_list_connections),
        )
        .route(
            "/api/v1/connections/pending",
            get(connections::handle_pending_connections),
        )
        .route(
            "/api/v1/connections/status/:user_id",
            get(connections::handle_connection_status),
        )
        .route(
            "/api/v1/connections/request",
            post(connections::handle_request_connection),
        )
        .route(
            "/api/v1/connections/:id/accept",
            put(connections::handle_accept_connection),
        )
        .route(
            "/api/v1/connections/:id/reject",
            put(connections::handle_reject_connection),
        )
        .route(
            "/api/v1/connections/:id",
            delete(connections::handle_remove_connection),
        )
        // Messages
        .route(
            "/api/v1/messages/conversations",
            get(messages::handle_conversations),
        )
        .route(
            "/api/v1/messages/conversation/:user_id",
            get(messages::handle_conversation),
        )
        .route("/api/v1/messages/send", post(messages::handle_send_message))
        .route(
            "/api/v1/messages/read/:conversation_id",
            put(messages::handle_mark_read),
        )
        .route(
            "/api/v1/messages/unread-count",
            get(messages::handle_unread_count),
        )
        .route(
            "/api/v1/messages/:id",
            delete(messages::handle_delete_message),
        )
        // Posts
        .route(
            "/api/v1/posts",
            get(posts::handle_list_posts).post(posts::handle_create_post),
        )
        .route("/api/v1/posts/trending", get(posts::handle_trending))
        .route(
            "/api/v1/posts/user/:user_id",
            get(posts::handle_posts_by_user),
        )
        .route(
            "/api/v1/posts/:id",
            get(posts::handle_get_post)
                .put(posts::handle_update_post)
                .delete(posts::handle_delete_post),
        )
        .route("/api/v1/posts/:id/like", post(posts::handle_toggle_like))
        .route("/api/v1/posts/:id/comment", post(posts::handle_add_comment))
        .route(
            "/api/v1/posts/:id/comments/:comment_id/like",
            post(posts::handle_toggle_comment_like),
        )
        .route("/api/v1/posts/:id/share", post(posts::handle_share))
        // Payments
        .route(
            "/api/v1/payments",
            get(payments::handle_list_payments).post(payments::handle_record_payment),
        )
        .route(
            "/api/v1/payments/:tx_hash",
            get(payments::handle_get_payment),
        )
        .route(
            "/api/v1/payments/:tx_hash/status",
            put(payments::handle_update_payment_status),
        )
        // AI
        .route("/api/v1/ai/extract-skills", post(ai::handle_extract_skills))
        .route(
            "/api/v1/ai/batch-skill-extraction",
            post(ai::handle_batch_extract),
        )
        .route("/api/v1/ai/job-match", post(ai::handle_job_match))
        .route(
            "/api/v1/ai/job-recommendations",
            get(ai::handle_job_recommendations),
        )
        .route("/api/v1/ai/analyze-job", post(ai::handle_analyze_job))
        .route(
            "/api/v1/ai/application-suggestions",
            post(ai::handle_application_suggestions),
        )
        .route("/api/v1/ai/match-history", get(ai::handle_match_history))
        .with_state(state)
}
