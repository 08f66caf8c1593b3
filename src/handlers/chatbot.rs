use super::{page_from, paginated, validate_payload};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{require_admin, AuthUser};
use crate::models::{
    chatbot_conversation::{ChatSender, MatchSource},
    chatbot_knowledge::{TrainingStatus, ValidationStatus},
    parse_enum, parse_optional_enum, ChatRoomModel, ChatbotConversationModel,
    ChatbotKnowledgeModel, ChatbotTagModel,
};
use crate::response::{ApiResponse, PaginatedResponse};
use crate::services::chatbot::{
    ChatReply, ChatbotService, KnowledgeChanges, KnowledgeFilter, KnowledgeInput, Question,
};
use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    Extension, Json,
};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[serde(default)]
    pub message: String,
    /// Continue an existing conversation; a new session starts when omitted
    pub session_id: Option<Uuid>,
    /// Restrict knowledge matches to one tag
    pub tag_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EscalateRequest {
    pub session_id: Uuid,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: Option<Uuid>,
    pub is_escalated: bool,
    pub escalation_reason: Option<String>,
    pub escalated_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl From<ChatRoomModel> for ChatRoomResponse {
    fn from(room: ChatRoomModel) -> Self {
        Self {
            id: room.id,
            session_id: room.session_id,
            user_id: room.user_id,
            is_escalated: room.is_escalated,
            escalation_reason: room.escalation_reason,
            escalated_at: room.escalated_at,
            created_at: room.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurnResponse {
    pub id: Uuid,
    pub sender: ChatSender,
    pub message: String,
    pub user_id: Option<Uuid>,
    pub knowledge_id: Option<Uuid>,
    pub match_source: Option<MatchSource>,
    pub created_at: NaiveDateTime,
}

impl From<ChatbotConversationModel> for ConversationTurnResponse {
    fn from(turn: ChatbotConversationModel) -> Self {
        Self {
            id: turn.id,
            sender: turn.sender,
            message: turn.message,
            user_id: turn.user_id,
            knowledge_id: turn.knowledge_id,
            match_source: turn.match_source,
            created_at: turn.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeResponse {
    pub id: Uuid,
    pub category: String,
    pub question: String,
    pub answer: String,
    pub priority: i32,
    pub keywords: Vec<String>,
    pub validation_status: ValidationStatus,
    pub training_status: TrainingStatus,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<ChatbotKnowledgeModel> for KnowledgeResponse {
    fn from(k: ChatbotKnowledgeModel) -> Self {
        Self {
            id: k.id,
            category: k.category,
            question: k.question,
            answer: k.answer,
            priority: k.priority,
            keywords: serde_json::from_value(k.keywords).unwrap_or_default(),
            validation_status: k.validation_status,
            training_status: k.training_status,
            is_active: k.is_active,
            created_by: k.created_by,
            created_at: k.created_at,
            updated_at: k.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub created_at: NaiveDateTime,
}

impl From<ChatbotTagModel> for TagResponse {
    fn from(tag: ChatbotTagModel) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            created_at: tag.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category: Option<String>,
    /// pending, validated or rejected
    pub validation_status: Option<String>,
    /// untrained, training or trained
    pub training_status: Option<String>,
    pub is_active: Option<bool>,
    pub tag_id: Option<Uuid>,
    /// Case-insensitive match on question or answer
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateKnowledgeRequest {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub category: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub question: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub answer: String,
    pub priority: Option<i32>,
    pub keywords: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKnowledgeRequest {
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 1000))]
    pub question: Option<String>,
    #[validate(length(max = 5000))]
    pub answer: Option<String>,
    pub priority: Option<i32>,
    pub keywords: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: String,
}

#[utoipa::path(
    post,
    path = "/api/chatbot/ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Bot reply; both turns are logged under the session", body = ChatReply),
        (status = 400, description = "Empty or too long message", body = AppError),
    ),
    tag = "chatbot"
)]
pub async fn ask(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: Option<AuthUser>,
    Json(payload): Json<AskRequest>,
) -> AppResult<impl IntoResponse> {
    let reply = ChatbotService::new(db)
        .ask(
            Question {
                message: payload.message,
                session_id: payload.session_id,
                tag_id: payload.tag_id,
            },
            auth_user.map(|u| u.user_id),
        )
        .await?;
    Ok(ApiResponse::ok(reply))
}

#[utoipa::path(
    post,
    path = "/api/chatbot/escalate",
    request_body = EscalateRequest,
    responses(
        (status = 200, description = "Session handed over to an admin", body = ChatRoomResponse),
    ),
    tag = "chatbot"
)]
pub async fn escalate(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: Option<AuthUser>,
    Json(payload): Json<EscalateRequest>,
) -> AppResult<impl IntoResponse> {
    validate_payload(&payload)?;
    let room = ChatbotService::new(db)
        .escalate(
            payload.session_id,
            auth_user.map(|u| u.user_id),
            payload.reason,
        )
        .await?;
    Ok(ApiResponse::with_message(
        ChatRoomResponse::from(room),
        "Percakapan diteruskan ke admin",
    ))
}

#[utoipa::path(
    get,
    path = "/api/chatbot/conversations/{session_id}",
    security(("jwt_token" = [])),
    params(("session_id" = Uuid, Path, description = "Chat session ID")),
    responses(
        (status = 200, description = "All turns, oldest first", body = [ConversationTurnResponse]),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "chatbot"
)]
pub async fn transcript(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(session_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let turns = ChatbotService::new(db).transcript(session_id).await?;
    let turns: Vec<ConversationTurnResponse> = turns.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(turns))
}

#[utoipa::path(
    get,
    path = "/api/chatbot/knowledge",
    security(("jwt_token" = [])),
    params(KnowledgeListQuery),
    responses(
        (status = 200, description = "Knowledge entries by priority", body = PaginatedResponse<KnowledgeResponse>),
        (status = 403, description = "Admin only", body = AppError),
    ),
    tag = "chatbot"
)]
pub async fn list_knowledge(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Query(query): Query<KnowledgeListQuery>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let filter = KnowledgeFilter {
        category: query.category.clone(),
        validation_status: parse_optional_enum(query.validation_status.as_deref(), "Status validasi")?,
        training_status: parse_optional_enum(query.training_status.as_deref(), "Status training")?,
        is_active: query.is_active,
        tag_id: query.tag_id,
        search: query.search.clone(),
    };
    let page = page_from(query.page, query.limit);
    let (items, total) = ChatbotService::new(db).list_knowledge(&filter, page).await?;
    Ok(ApiResponse::ok(paginated::<_, KnowledgeResponse>(items, total, page)))
}

#[utoipa::path(
    get,
    path = "/api/chatbot/knowledge/{id}",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Knowledge ID")),
    responses(
        (status = 200, description = "Knowledge entry", body = KnowledgeResponse),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "chatbot"
)]
pub async fn get_knowledge(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let entry = ChatbotService::new(db).get_knowledge(id).await?;
    Ok(ApiResponse::ok(KnowledgeResponse::from(entry)))
}

#[utoipa::path(
    post,
    path = "/api/chatbot/knowledge",
    security(("jwt_token" = [])),
    request_body = CreateKnowledgeRequest,
    responses(
        (status = 201, description = "Entry created, pending validation", body = KnowledgeResponse),
        (status = 400, description = "Missing category, question or answer", body = AppError),
    ),
    tag = "chatbot"
)]
pub async fn create_knowledge(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<CreateKnowledgeRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    validate_payload(&payload)?;
    let entry = ChatbotService::new(db)
        .create_knowledge(
            KnowledgeInput {
                category: payload.category,
                question: payload.question,
                answer: payload.answer,
                priority: payload.priority,
                keywords: payload.keywords,
                is_active: payload.is_active,
            },
            auth_user.user_id,
        )
        .await?;
    Ok(ApiResponse::created(
        KnowledgeResponse::from(entry),
        "Data pengetahuan berhasil ditambahkan",
    ))
}

#[utoipa::path(
    put,
    path = "/api/chatbot/knowledge/{id}",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Knowledge ID")),
    request_body = UpdateKnowledgeRequest,
    responses(
        (status = 200, description = "Entry updated", body = KnowledgeResponse),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "chatbot"
)]
pub async fn update_knowledge(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateKnowledgeRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    validate_payload(&payload)?;
    let entry = ChatbotService::new(db)
        .update_knowledge(
            id,
            KnowledgeChanges {
                category: payload.category,
                question: payload.question,
                answer: payload.answer,
                priority: payload.priority,
                keywords: payload.keywords,
                is_active: payload.is_active,
            },
        )
        .await?;
    Ok(ApiResponse::with_message(
        KnowledgeResponse::from(entry),
        "Data pengetahuan berhasil diperbarui",
    ))
}

#[utoipa::path(
    delete,
    path = "/api/chatbot/knowledge/{id}",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Knowledge ID")),
    responses(
        (status = 200, description = "Entry deleted"),
        (status = 404, description = "Not found", body = AppError),
    ),
    tag = "chatbot"
)]
pub async fn delete_knowledge(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    ChatbotService::new(db).delete_knowledge(id).await?;
    Ok(ApiResponse::message_only("Data pengetahuan berhasil dihapus"))
}

#[utoipa::path(
    put,
    path = "/api/chatbot/knowledge/{id}/validation",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Knowledge ID")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Validation status set", body = KnowledgeResponse),
        (status = 400, description = "Unknown status", body = AppError),
    ),
    tag = "chatbot"
)]
pub async fn set_validation_status(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let status = parse_enum::<ValidationStatus>(&payload.status, "Status validasi")?;
    let entry = ChatbotService::new(db)
        .set_validation_status(id, status)
        .await?;
    Ok(ApiResponse::ok(KnowledgeResponse::from(entry)))
}

#[utoipa::path(
    put,
    path = "/api/chatbot/knowledge/{id}/training",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Knowledge ID")),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Training status set", body = KnowledgeResponse),
        (status = 400, description = "Unknown status", body = AppError),
    ),
    tag = "chatbot"
)]
pub async fn set_training_status(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let status = parse_enum::<TrainingStatus>(&payload.status, "Status training")?;
    let entry = ChatbotService::new(db)
        .set_training_status(id, status)
        .await?;
    Ok(ApiResponse::ok(KnowledgeResponse::from(entry)))
}

#[utoipa::path(
    get,
    path = "/api/chatbot/tags",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "All tags by name", body = [TagResponse]),
    ),
    tag = "chatbot"
)]
pub async fn list_tags(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let tags = ChatbotService::new(db).list_tags().await?;
    let tags: Vec<TagResponse> = tags.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(tags))
}

#[utoipa::path(
    post,
    path = "/api/chatbot/tags",
    security(("jwt_token" = [])),
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created", body = TagResponse),
        (status = 409, description = "Tag already exists", body = AppError),
    ),
    tag = "chatbot"
)]
pub async fn create_tag(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Json(payload): Json<CreateTagRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let tag = ChatbotService::new(db).create_tag(&payload.name).await?;
    Ok(ApiResponse::created(TagResponse::from(tag), "Tag berhasil dibuat"))
}

#[utoipa::path(
    get,
    path = "/api/chatbot/knowledge/{id}/tags",
    security(("jwt_token" = [])),
    params(("id" = Uuid, Path, description = "Knowledge ID")),
    responses(
        (status = 200, description = "Tags attached to the entry", body = [TagResponse]),
    ),
    tag = "chatbot"
)]
pub async fn knowledge_tags(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    let tags = ChatbotService::new(db).tags_of(id).await?;
    let tags: Vec<TagResponse> = tags.into_iter().map(Into::into).collect();
    Ok(ApiResponse::ok(tags))
}

#[utoipa::path(
    put,
    path = "/api/chatbot/knowledge/{id}/tags/{tag_id}",
    security(("jwt_token" = [])),
    params(
        ("id" = Uuid, Path, description = "Knowledge ID"),
        ("tag_id" = Uuid, Path, description = "Tag ID"),
    ),
    responses(
        (status = 200, description = "Tag attached"),
        (status = 404, description = "Entry or tag not found", body = AppError),
    ),
    tag = "chatbot"
)]
pub async fn attach_tag(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    ChatbotService::new(db).attach_tag(id, tag_id).await?;
    Ok(ApiResponse::message_only("Tag berhasil ditambahkan"))
}

#[utoipa::path(
    delete,
    path = "/api/chatbot/knowledge/{id}/tags/{tag_id}",
    security(("jwt_token" = [])),
    params(
        ("id" = Uuid, Path, description = "Knowledge ID"),
        ("tag_id" = Uuid, Path, description = "Tag ID"),
    ),
    responses(
        (status = 200, description = "Tag detached"),
    ),
    tag = "chatbot"
)]
pub async fn detach_tag(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    require_admin(&auth_user)?;
    ChatbotService::new(db).detach_tag(id, tag_id).await?;
    Ok(ApiResponse::message_only("Tag berhasil dilepas"))
}
