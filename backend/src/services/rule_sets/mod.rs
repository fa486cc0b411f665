//! # Rule Set Service Module
//!
//! Management of the rule catalogs documents are analysed against, under
//! `/api/rule-sets`. Rule sets are never deleted: `DELETE` deactivates them so
//! running and historical analyses keep a valid reference. Single rules can be
//! edited or removed; jobs already running keep the catalog they started with.

use crate::db::Db;
use crate::error::ApiError;
use actix_web::web::{self, delete, get, post, put, scope};
use actix_web::{HttpResponse, Scope};
use common::model::rule_set::CatalogEntry;
use common::requests::{
    AddRulesRequest, CatalogQuery, CreateRuleSetRequest, MessageResponse, RuleCatalog,
    UpdateRuleRequest,
};
use log::info;

const API_PATH: &str = "/api/rule-sets";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list))
        .route("", post().to(create))
        .route("/{rule_set_id}", get().to(fetch))
        .route("/{rule_set_id}", delete().to(deactivate))
        .route("/{rule_set_id}/rules", post().to(add_rules))
        .route("/{rule_set_id}/rules/{rule_id}", put().to(update_rule))
        .route("/{rule_set_id}/rules/{rule_id}", delete().to(delete_rule))
        .route("/{rule_set_id}/catalog", get().to(catalog))
}

async fn list(db: web::Data<Db>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(db.list_rule_sets()?))
}

async fn create(
    db: web::Data<Db>,
    payload: web::Json<CreateRuleSetRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let set = db.create_rule_set(&req.name, req.description.as_deref())?;
    info!("Created rule set {} ({})", set.id, set.name);
    Ok(HttpResponse::Created().json(set))
}

async fn fetch(db: web::Data<Db>, id: web::Path<i64>) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let set = db
        .get_rule_set(id)?
        .ok_or_else(|| ApiError::NotFound(format!("Rule set {} not found", id)))?;
    Ok(HttpResponse::Ok().json(set))
}

async fn add_rules(
    db: web::Data<Db>,
    id: web::Path<i64>,
    payload: web::Json<AddRulesRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let added = db.add_rules(id, &payload.rules)?;
    info!("Added {} rules to rule set {}", added, id);
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: format!("Added {} rules", added),
    }))
}

async fn update_rule(
    db: web::Data<Db>,
    path: web::Path<(i64, i64)>,
    payload: web::Json<UpdateRuleRequest>,
) -> Result<HttpResponse, ApiError> {
    let (set_id, rule_id) = path.into_inner();
    let rule = db
        .update_rule(set_id, rule_id, &payload)?
        .ok_or_else(|| ApiError::NotFound(format!("Rule {} not found", rule_id)))?;
    info!("Updated rule {} in rule set {}", rule_id, set_id);
    Ok(HttpResponse::Ok().json(rule))
}

async fn delete_rule(
    db: web::Data<Db>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse, ApiError> {
    let (set_id, rule_id) = path.into_inner();
    if !db.delete_rule(set_id, rule_id)? {
        return Err(ApiError::NotFound(format!("Rule {} not found", rule_id)));
    }
    info!("Deleted rule {} from rule set {}", rule_id, set_id);
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Rule deleted".to_string(),
    }))
}

/// Rule numbers and titles in force on `effective_date` (today when absent).
async fn catalog(
    db: web::Data<Db>,
    id: web::Path<i64>,
    query: web::Query<CatalogQuery>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    if db.get_rule_set(id)?.is_none() {
        return Err(ApiError::NotFound(format!("Rule set {} not found", id)));
    }
    let catalog: Vec<CatalogEntry> = db
        .rule_catalog(id, query.effective_date)?
        .iter()
        .map(CatalogEntry::from)
        .collect();
    Ok(HttpResponse::Ok().json(RuleCatalog {
        count: catalog.len(),
        catalog,
    }))
}

async fn deactivate(db: web::Data<Db>, id: web::Path<i64>) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    if !db.deactivate_rule_set(id)? {
        return Err(ApiError::NotFound(format!(
            "Active rule set {} not found",
            id
        )));
    }
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Rule set deactivated".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::services::testing::TestContext;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use common::model::rule_set::{Rule, RuleSet};
    use common::requests::{AddRulesRequest, CreateRuleSetRequest, RuleCatalog, UpdateRuleRequest};

    #[actix_web::test]
    async fn create_add_rules_and_deactivate() {
        let ctx = TestContext::new();
        let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

        let req = test::TestRequest::post()
            .uri("/api/rule-sets")
            .set_json(CreateRuleSetRequest {
                name: "SEC Marketing Rule".to_string(),
                description: Some("206(4)-1".to_string()),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: RuleSet = test::read_body_json(resp).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/rule-sets/{}/rules", created.id))
            .set_json(AddRulesRequest {
                rules: vec![Rule {
                    id: None,
                    rule_number: "206(4)-1(a)".to_string(),
                    rule_title: "General prohibitions".to_string(),
                    rule_text: "Advertisements may not include untrue statements.".to_string(),
                    category: Some("marketing".to_string()),
                    keywords: vec!["Testimonial".to_string()],
                    effective_start_date: None,
                    effective_end_date: None,
                }],
            })
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri(&format!("/api/rule-sets/{}", created.id))
            .to_request();
        let fetched: RuleSet = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched.rules.len(), 1);
        assert_eq!(fetched.rules[0].keywords, vec!["testimonial"]);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/rule-sets/{}", created.id))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/rule-sets").to_request();
        let listed: Vec<RuleSet> = test::call_and_read_body_json(&app, req).await;
        assert!(listed.is_empty());
    }

    #[actix_web::test]
    async fn duplicate_names_and_unknown_ids_are_rejected() {
        let ctx = TestContext::new();
        ctx.seed_rule_set("FINRA", 0);
        let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

        let req = test::TestRequest::post()
            .uri("/api/rule-sets")
            .set_json(CreateRuleSetRequest {
                name: "FINRA".to_string(),
                description: None,
            })
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::get().uri("/api/rule-sets/42").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[actix_web::test]
    async fn catalog_and_single_rule_maintenance() {
        let ctx = TestContext::new();
        let set_id = ctx.seed_rule_set("FINRA", 3);
        let app = test::init_service(App::new().configure(|cfg| ctx.configure(cfg))).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/rule-sets/{set_id}/catalog"))
            .to_request();
        let catalog: RuleCatalog = test::call_and_read_body_json(&app, req).await;
        assert_eq!(catalog.count, 3);
        assert_eq!(catalog.catalog[0].rule_number, "2000");

        let req = test::TestRequest::get()
            .uri(&format!("/api/rule-sets/{set_id}"))
            .to_request();
        let set: RuleSet = test::call_and_read_body_json(&app, req).await;
        let rule_id = set.rules[0].id.unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/api/rule-sets/{set_id}/rules/{rule_id}"))
            .set_json(UpdateRuleRequest {
                rule_title: Some("Conflicts of interest".to_string()),
                ..UpdateRuleRequest::default()
            })
            .to_request();
        let updated: Rule = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated.rule_title, "Conflicts of interest");
        assert_eq!(updated.id, Some(rule_id));

        let req = test::TestRequest::delete()
            .uri(&format!("/api/rule-sets/{set_id}/rules/{rule_id}"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let req = test::TestRequest::delete()
            .uri(&format!("/api/rule-sets/{set_id}/rules/{rule_id}"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );

        let req = test::TestRequest::get()
            .uri(&format!("/api/rule-sets/{set_id}/catalog"))
            .to_request();
        let catalog: RuleCatalog = test::call_and_read_body_json(&app, req).await;
        assert_eq!(catalog.count, 2);

        let req = test::TestRequest::get()
            .uri("/api/rule-sets/999/catalog")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
