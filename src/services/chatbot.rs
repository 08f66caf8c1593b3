use crate::{
    error::{AppError, AppResult},
    models::{
        chat_room,
        chatbot_conversation::{self, ChatSender, MatchSource},
        chatbot_knowledge::{self, TrainingStatus, ValidationStatus},
        chatbot_knowledge_tag, chatbot_tag, ChatRoom, ChatRoomModel, ChatbotConversation,
        ChatbotConversationModel, ChatbotKnowledge, ChatbotKnowledgeModel, ChatbotKnowledgeTag,
        ChatbotTag, ChatbotTagModel,
    },
    repository::{query::contains_ci, Page},
};
use chrono::Utc;
use sea_orm::{
    sea_query::{OnConflict, Query},
    ActiveModelTrait,
    ActiveValue::Set,
    ColumnTrait, Condition, DatabaseConnection, DbBackend, EntityTrait, FromQueryResult,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Statement,
};
use serde::Serialize;
use uuid::Uuid;

pub const MSG_KNOWLEDGE_NOT_FOUND: &str = "Data pengetahuan tidak ditemukan";
pub const MSG_TAG_NOT_FOUND: &str = "Tag tidak ditemukan";
const MAX_MESSAGE_CHARS: usize = 1000;

const REPLY_CREDIT: &str = "Untuk simulasi kredit, Anda bisa buka menu Simulasi dan pilih tenor serta DP. Mau saya arahkan ke halaman simulasi?";
const REPLY_TEST_DRIVE: &str = "Anda bisa menjadwalkan test drive di halaman Test Drive. Pilih tanggal dan lokasi yang tersedia.";
const REPLY_PROMO: &str = "Promo aktif tersedia di halaman Konten/Promo. Anda bisa melihat detail promo di sana.";
const REPLY_RECOMMENDATION: &str = "Saya bisa membantu rekomendasi berdasarkan budget dan kebutuhan. Sebutkan budget atau tipe mobil yang Anda cari.";
const REPLY_DEFAULT: &str = "Saya memahami pertanyaan Anda. Jika perlu bantuan langsung, tekan \"Hubungi Admin\" untuk chat dengan admin.";

/// Canned answer when the knowledge base has nothing. The first keyword
/// group that appears anywhere in the text wins.
pub fn keyword_reply(text: &str) -> (MatchSource, &'static str) {
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["kredit", "cicil"]) {
        (MatchSource::Keyword, REPLY_CREDIT)
    } else if has(&["test", "drive"]) {
        (MatchSource::Keyword, REPLY_TEST_DRIVE)
    } else if has(&["promo", "diskon"]) {
        (MatchSource::Keyword, REPLY_PROMO)
    } else if has(&["mobil", "rekomendasi"]) {
        (MatchSource::Keyword, REPLY_RECOMMENDATION)
    } else {
        (MatchSource::Fallback, REPLY_DEFAULT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct KnowledgeMatch {
    pub id: Uuid,
    pub answer: String,
}

#[derive(Debug, Clone, Default)]
pub struct Question {
    pub message: String,
    pub session_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub session_id: Uuid,
    pub reply: String,
    pub match_source: MatchSource,
    pub knowledge_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeInput {
    pub category: String,
    pub question: String,
    pub answer: String,
    pub priority: Option<i32>,
    pub keywords: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeChanges {
    pub category: Option<String>,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub priority: Option<i32>,
    pub keywords: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeFilter {
    pub category: Option<String>,
    pub validation_status: Option<ValidationStatus>,
    pub training_status: Option<TrainingStatus>,
    pub is_active: Option<bool>,
    pub tag_id: Option<Uuid>,
    pub search: Option<String>,
}

impl KnowledgeFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            cond = cond.add(chatbot_knowledge::Column::Category.eq(category));
        }
        if let Some(s) = self.validation_status {
            cond = cond.add(chatbot_knowledge::Column::ValidationStatus.eq(s));
        }
        if let Some(s) = self.training_status {
            cond = cond.add(chatbot_knowledge::Column::TrainingStatus.eq(s));
        }
        if let Some(active) = self.is_active {
            cond = cond.add(chatbot_knowledge::Column::IsActive.eq(active));
        }
        if let Some(tag_id) = self.tag_id {
            cond = cond.add(
                chatbot_knowledge::Column::Id.in_subquery(
                    Query::select()
                        .column(chatbot_knowledge_tag::Column::KnowledgeId)
                        .from(ChatbotKnowledgeTag)
                        .and_where(chatbot_knowledge_tag::Column::TagId.eq(tag_id))
                        .to_owned(),
                ),
            );
        }
        if let Some(q) = self.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            cond = cond.add(
                Condition::any()
                    .add(contains_ci(chatbot_knowledge::Column::Question, q))
                    .add(contains_ci(chatbot_knowledge::Column::Answer, q)),
            );
        }
        cond
    }
}

fn required(value: &str, label: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::validation(format!("{label} wajib diisi")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn keywords_json(keywords: Vec<String>) -> serde_json::Value {
    let cleaned: Vec<String> = keywords
        .into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    serde_json::Value::from(cleaned)
}

pub struct ChatbotService {
    db: DatabaseConnection,
}

impl ChatbotService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Best active knowledge row for `text`: highest priority first, then
    /// full-text rank.
    pub async fn answer_for(&self, text: &str, tag_id: Option<Uuid>) -> AppResult<Option<KnowledgeMatch>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT k.id, k.answer
            FROM chatbot_knowledge_base k
            WHERE k.is_active
              AND k.search_vector @@ websearch_to_tsquery('simple', $1)
              AND ($2::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM chatbot_knowledge_tags t
                    WHERE t.knowledge_id = k.id AND t.tag_id = $2))
            ORDER BY k.priority DESC,
                     ts_rank(k.search_vector, websearch_to_tsquery('simple', $1)) DESC
            LIMIT 1
            "#,
            [text.into(), tag_id.into()],
        );
        Ok(KnowledgeMatch::find_by_statement(stmt).one(&self.db).await?)
    }

    /// Answer one user message and log both turns under the session.
    pub async fn ask(&self, question: Question, user_id: Option<Uuid>) -> AppResult<ChatReply> {
        let message = required(&question.message, "Pesan")?;
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::validation(format!(
                "Pesan maksimal {MAX_MESSAGE_CHARS} karakter"
            )));
        }
        let session_id = question.session_id.unwrap_or_else(Uuid::new_v4);

        let (reply, match_source, knowledge_id) =
            match self.answer_for(&message, question.tag_id).await? {
                Some(hit) => (hit.answer, MatchSource::Knowledge, Some(hit.id)),
                None => {
                    let (source, canned) = keyword_reply(&message);
                    (canned.to_string(), source, None)
                }
            };

        self.log_turn(session_id, user_id, ChatSender::User, &message, None, None)
            .await?;
        self.log_turn(
            session_id,
            user_id,
            ChatSender::Bot,
            &reply,
            knowledge_id,
            Some(match_source),
        )
        .await?;

        tracing::debug!(session_id = %session_id, source = ?match_source, "chatbot answered");
        Ok(ChatReply {
            session_id,
            reply,
            match_source,
            knowledge_id,
        })
    }

    async fn log_turn(
        &self,
        session_id: Uuid,
        user_id: Option<Uuid>,
        sender: ChatSender,
        message: &str,
        knowledge_id: Option<Uuid>,
        match_source: Option<MatchSource>,
    ) -> AppResult<()> {
        chatbot_conversation::ActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(session_id),
            user_id: Set(user_id),
            sender: Set(sender),
            message: Set(message.to_string()),
            knowledge_id: Set(knowledge_id),
            match_source: Set(match_source),
            created_at: Set(Utc::now().naive_utc()),
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }

    /// Marks the session's chat room as escalated, creating it if needed.
    pub async fn escalate(
        &self,
        session_id: Uuid,
        user_id: Option<Uuid>,
        reason: Option<String>,
    ) -> AppResult<ChatRoomModel> {
        let now = Utc::now().naive_utc();
        let room = chat_room::ActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(session_id),
            user_id: Set(user_id),
            is_escalated: Set(true),
            escalation_reason: Set(reason.filter(|r| !r.trim().is_empty())),
            escalated_at: Set(Some(now)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let room = ChatRoom::insert(room)
            .on_conflict(
                OnConflict::column(chat_room::Column::SessionId)
                    .update_columns([
                        chat_room::Column::IsEscalated,
                        chat_room::Column::EscalationReason,
                        chat_room::Column::EscalatedAt,
                        chat_room::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(&self.db)
            .await?;

        tracing::info!(session_id = %session_id, "chat escalated to admin");
        Ok(room)
    }

    pub async fn transcript(&self, session_id: Uuid) -> AppResult<Vec<ChatbotConversationModel>> {
        Ok(ChatbotConversation::find()
            .filter(chatbot_conversation::Column::SessionId.eq(session_id))
            .order_by_asc(chatbot_conversation::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn list_knowledge(
        &self,
        filter: &KnowledgeFilter,
        page: Page,
    ) -> AppResult<(Vec<ChatbotKnowledgeModel>, u64)> {
        let paginator = ChatbotKnowledge::find()
            .filter(filter.condition())
            .order_by_desc(chatbot_knowledge::Column::Priority)
            .order_by_desc(chatbot_knowledge::Column::CreatedAt)
            .paginate(&self.db, page.limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;
        Ok((items, total))
    }

    pub async fn get_knowledge(&self, id: Uuid) -> AppResult<ChatbotKnowledgeModel> {
        ChatbotKnowledge::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound(MSG_KNOWLEDGE_NOT_FOUND))
    }

    pub async fn create_knowledge(
        &self,
        input: KnowledgeInput,
        created_by: Uuid,
    ) -> AppResult<ChatbotKnowledgeModel> {
        let category = required(&input.category, "Kategori")?;
        let question = required(&input.question, "Pertanyaan")?;
        let answer = required(&input.answer, "Jawaban")?;

        let now = Utc::now().naive_utc();
        let created = chatbot_knowledge::ActiveModel {
            id: Set(Uuid::new_v4()),
            category: Set(category),
            question: Set(question),
            answer: Set(answer),
            priority: Set(input.priority.unwrap_or(0)),
            keywords: Set(keywords_json(input.keywords.unwrap_or_default())),
            validation_status: Set(ValidationStatus::Pending),
            training_status: Set(TrainingStatus::Untrained),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_by: Set(Some(created_by)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;
        Ok(created)
    }

    pub async fn update_knowledge(
        &self,
        id: Uuid,
        changes: KnowledgeChanges,
    ) -> AppResult<ChatbotKnowledgeModel> {
        let existing = self.get_knowledge(id).await?;
        let mut active: chatbot_knowledge::ActiveModel = existing.into();

        if let Some(v) = changes.category {
            active.category = Set(required(&v, "Kategori")?);
        }
        if let Some(v) = changes.question {
            active.question = Set(required(&v, "Pertanyaan")?);
        }
        if let Some(v) = changes.answer {
            active.answer = Set(required(&v, "Jawaban")?);
        }
        if let Some(v) = changes.priority {
            active.priority = Set(v);
        }
        if let Some(v) = changes.keywords {
            active.keywords = Set(keywords_json(v));
        }
        if let Some(v) = changes.is_active {
            active.is_active = Set(v);
        }
        active.updated_at = Set(Utc::now().naive_utc());
        Ok(active.update(&self.db).await?)
    }

    pub async fn delete_knowledge(&self, id: Uuid) -> AppResult<()> {
        let result = ChatbotKnowledge::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(MSG_KNOWLEDGE_NOT_FOUND));
        }
        Ok(())
    }

    pub async fn set_validation_status(
        &self,
        id: Uuid,
        status: ValidationStatus,
    ) -> AppResult<ChatbotKnowledgeModel> {
        let mut active: chatbot_knowledge::ActiveModel = self.get_knowledge(id).await?.into();
        active.validation_status = Set(status);
        active.updated_at = Set(Utc::now().naive_utc());
        Ok(active.update(&self.db).await?)
    }

    pub async fn set_training_status(
        &self,
        id: Uuid,
        status: TrainingStatus,
    ) -> AppResult<ChatbotKnowledgeModel> {
        let mut active: chatbot_knowledge::ActiveModel = self.get_knowledge(id).await?.into();
        active.training_status = Set(status);
        active.updated_at = Set(Utc::now().naive_utc());
        Ok(active.update(&self.db).await?)
    }

    pub async fn list_tags(&self) -> AppResult<Vec<ChatbotTagModel>> {
        Ok(ChatbotTag::find()
            .order_by_asc(chatbot_tag::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn create_tag(&self, name: &str) -> AppResult<ChatbotTagModel> {
        let name = required(name, "Nama tag")?.to_lowercase();
        let exists = ChatbotTag::find()
            .filter(chatbot_tag::Column::Name.eq(name.as_str()))
            .one(&self.db)
            .await?
            .is_some();
        if exists {
            return Err(AppError::Conflict("Tag sudah ada".to_string()));
        }

        Ok(chatbot_tag::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_at: Set(Utc::now().naive_utc()),
        }
        .insert(&self.db)
        .await?)
    }

    /// Attaching twice is a no-op.
    pub async fn attach_tag(&self, knowledge_id: Uuid, tag_id: Uuid) -> AppResult<()> {
        self.get_knowledge(knowledge_id).await?;
        if ChatbotTag::find_by_id(tag_id).one(&self.db).await?.is_none() {
            return Err(AppError::NotFound(MSG_TAG_NOT_FOUND));
        }

        ChatbotKnowledgeTag::insert(chatbot_knowledge_tag::ActiveModel {
            knowledge_id: Set(knowledge_id),
            tag_id: Set(tag_id),
        })
        .on_conflict(
            OnConflict::columns([
                chatbot_knowledge_tag::Column::KnowledgeId,
                chatbot_knowledge_tag::Column::TagId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .do_nothing()
        .exec(&self.db)
        .await?;
        Ok(())
    }

    pub async fn detach_tag(&self, knowledge_id: Uuid, tag_id: Uuid) -> AppResult<()> {
        ChatbotKnowledgeTag::delete_many()
            .filter(chatbot_knowledge_tag::Column::KnowledgeId.eq(knowledge_id))
            .filter(chatbot_knowledge_tag::Column::TagId.eq(tag_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn tags_of(&self, knowledge_id: Uuid) -> AppResult<Vec<ChatbotTagModel>> {
        let knowledge = self.get_knowledge(knowledge_id).await?;
        Ok(knowledge.find_related(ChatbotTag).all(&self.db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_questions_get_the_credit_reply() {
        let (source, reply) = keyword_reply("Berapa cicilan per bulan?");
        assert_eq!(source, MatchSource::Keyword);
        assert_eq!(reply, REPLY_CREDIT);
    }

    #[test]
    fn earlier_groups_win() {
        let (_, reply) = keyword_reply("Ada promo kredit untuk mobil ini?");
        assert_eq!(reply, REPLY_CREDIT);
        let (_, reply) = keyword_reply("Mau TEST DRIVE mobil listrik");
        assert_eq!(reply, REPLY_TEST_DRIVE);
    }

    #[test]
    fn unmatched_text_falls_back() {
        let (source, reply) = keyword_reply("halo");
        assert_eq!(source, MatchSource::Fallback);
        assert_eq!(reply, REPLY_DEFAULT);
    }

    #[test]
    fn keywords_are_normalized() {
        let json = keywords_json(vec![" SUV ".into(), "".into(), "Keluarga".into()]);
        assert_eq!(json, serde_json::json!(["suv", "keluarga"]));
    }

    #[test]
    fn knowledge_fields_are_required() {
        let err = required("  ", "Pertanyaan").unwrap_err();
        assert_eq!(err.public_message(), "Pertanyaan wajib diisi");
    }
}
