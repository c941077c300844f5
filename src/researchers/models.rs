use crate::common::errors::{BusinessResult, DbErrorExt};
use crate::common::list::{ListParams, Page};
use crate::common::validation::{Checker, ValidationMode, Violations};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, Condition, Order, PaginatorTrait, QueryOrder, QuerySelect, TransactionTrait,
    entity::prelude::*,
    sea_query::{Expr, Func},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const NAME_MAX: usize = 255;
const EMAIL_MAX: usize = 254;
const PHONE_MAX: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "researcher_info")]
#[schema(as = Researcher)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub researcher_id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone: Option<String>,
    pub affiliation: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::sample_researchers::models::Entity")]
    SampleResearchers,
}

impl Related<crate::sample_researchers::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SampleResearchers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub type Researcher = Model;

/// Researcher fields as sent by clients.
///
/// `POST` and `PUT` require `name` and `email`; `PATCH` applies only the keys
/// present. `phone` and `affiliation` distinguish an explicit `null` (clear)
/// from an absent key (keep).
#[derive(ToSchema, Deserialize, Serialize, Clone, Debug, Default)]
pub struct ResearcherInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub affiliation: Option<Option<String>>,
}

impl ResearcherInput {
    fn check(&self, mode: ValidationMode, partial: bool) -> Result<(), Violations> {
        let mut checker = Checker::new(mode);

        match &self.name {
            Some(name) if name.trim().is_empty() => checker.reject("name", "cannot be empty"),
            Some(name) if name.chars().count() > NAME_MAX => {
                checker.reject("name", format!("must be at most {NAME_MAX} characters"));
            }
            None if !partial => checker.reject("name", "is required"),
            _ => {}
        }

        match &self.email {
            Some(email) if !is_valid_email(email) => {
                checker.reject("email", "must be a valid email address");
            }
            None if !partial => checker.reject("email", "is required"),
            _ => {}
        }

        if let Some(Some(phone)) = &self.phone {
            if phone.chars().count() > PHONE_MAX {
                checker.reject("phone", format!("must be at most {PHONE_MAX} characters"));
            }
        }

        checker.finish(Some(()))
    }
}

/// Syntactic check: one `@`, a non-empty local part and a dotted domain
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > EMAIL_MAX || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

/// Columns matched case-insensitively as substrings by the list filter
pub const FILTERABLE: [&str; 3] = ["name", "email", "affiliation"];
pub const SORTABLE: [&str; 4] = ["researcher_id", "name", "email", "created_at"];

fn column_named(name: &str) -> Option<Column> {
    match name {
        "researcher_id" => Some(Column::ResearcherId),
        "name" => Some(Column::Name),
        "email" => Some(Column::Email),
        "affiliation" => Some(Column::Affiliation),
        "created_at" => Some(Column::CreatedAt),
        _ => None,
    }
}

/// Researchers matching `params`, by name unless another order is asked for
pub async fn get_all_researchers(
    db: &DatabaseConnection,
    params: &ListParams,
) -> BusinessResult<Page<Model>> {
    let mut condition = Condition::all();
    for key in FILTERABLE {
        if let (Some(needle), Some(column)) = (params.text(key)?, column_named(key)) {
            condition = condition
                .add(Expr::expr(Func::lower(Expr::col(column))).like(format!("%{needle}%")));
        }
    }

    let query = Entity::find().filter(condition);
    let total = query.clone().count(db).await?;

    let query = match params.sort.as_ref().and_then(|(name, order)| Some((column_named(name)?, order))) {
        Some((column, order)) => query.order_by(column, order.clone()),
        None => query.order_by(Column::Name, Order::Asc),
    };
    let items = query
        .order_by_asc(Column::ResearcherId)
        .offset(params.offset)
        .limit(params.limit)
        .all(db)
        .await?;

    Ok(Page {
        items,
        offset: params.offset,
        total,
    })
}

pub async fn get_one_researcher<C: ConnectionTrait>(db: &C, id: i32) -> BusinessResult<Model> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| crate::not_found!("Researcher", id))
}

pub async fn create_researcher(
    db: &DatabaseConnection,
    mode: ValidationMode,
    input: &ResearcherInput,
) -> BusinessResult<Model> {
    input.check(mode, false)?;

    let inserted = ActiveModel {
        name: Set(input.name.as_deref().map(trimmed).unwrap_or_default()),
        email: Set(input.email.as_deref().map(trimmed).unwrap_or_default()),
        phone: Set(input.phone.clone().flatten()),
        affiliation: Set(input.affiliation.clone().flatten()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| e.to_business_error("Researcher"))?;

    tracing::info!(researcher_id = inserted.researcher_id, "Researcher created");
    Ok(inserted)
}

/// Applies `input` to an existing researcher; `partial` selects PATCH semantics
pub async fn update_researcher(
    db: &DatabaseConnection,
    mode: ValidationMode,
    id: i32,
    input: &ResearcherInput,
    partial: bool,
) -> BusinessResult<Model> {
    input.check(mode, partial)?;

    let existing = get_one_researcher(db, id).await?;
    let mut active: ActiveModel = existing.into();

    if let Some(name) = &input.name {
        active.name = Set(trimmed(name));
    }
    if let Some(email) = &input.email {
        active.email = Set(trimmed(email));
    }
    match (&input.phone, partial) {
        (Some(phone), _) => active.phone = Set(phone.clone()),
        (None, false) => active.phone = Set(None),
        (None, true) => {}
    }
    match (&input.affiliation, partial) {
        (Some(affiliation), _) => active.affiliation = Set(affiliation.clone()),
        (None, false) => active.affiliation = Set(None),
        (None, true) => {}
    }

    let updated = active
        .update(db)
        .await
        .map_err(|e| e.to_business_error("Researcher"))?;

    tracing::info!(researcher_id = id, "Researcher updated");
    Ok(updated)
}

/// Deletes a researcher together with every sample link naming them
pub async fn delete_researcher(db: &DatabaseConnection, id: i32) -> BusinessResult<()> {
    use crate::sample_researchers::models as links;

    let txn = db.begin().await?;
    get_one_researcher(&txn, id).await?;

    let removed = links::Entity::delete_many()
        .filter(links::Column::ResearcherId.eq(id))
        .exec(&txn)
        .await?;
    Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        researcher_id = id,
        links_removed = removed.rows_affected,
        "Researcher deleted"
    );
    Ok(())
}
