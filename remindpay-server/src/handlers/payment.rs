use actix_web::{web, HttpRequest, HttpResponse};
use remindpay_common::service::payment::PaymentWorkflow;
use remindpay_common::store::{PaymentStatus, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::error::HttpErrorResponse;
use crate::env;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

#[derive(Debug, Deserialize, Serialize)]
pub struct InputPaymentStatus {
    pub status: PaymentStatus,
    pub gateway_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OutputStatusUpdate {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub activated_premium: bool,
}

/// Operator-triggered confirmation endpoint for manual payments.
pub async fn update_status(
    req: HttpRequest,
    payment_workflow: web::Data<PaymentWorkflow>,
    payment_id: web::Path<Uuid>,
    input: web::Json<InputPaymentStatus>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verify_admin_key(&req)?;

    let payment_id = payment_id.into_inner();
    let update = payment_workflow
        .update_status(payment_id, input.status, input.gateway_ref.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(OutputStatusUpdate {
        payment_id,
        status: update.status,
        activated_premium: update.activated_premium,
    }))
}

pub async fn get_pending(
    req: HttpRequest,
    store: web::Data<Arc<dyn Store>>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verify_admin_key(&req)?;

    let payments = store
        .list_payments_by_status(PaymentStatus::Pending)
        .await
        .map_err(|e| {
            log::error!("{e}");
            HttpErrorResponse::InternalError(String::from("Failed to list pending payments"))
        })?;

    Ok(HttpResponse::Ok().json(payments))
}

fn verify_admin_key(req: &HttpRequest) -> Result<(), HttpErrorResponse> {
    let key = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    let Some(key) = key else {
        return Err(HttpErrorResponse::IncorrectCredential(String::from(
            "Missing admin key",
        )));
    };

    let correct_key = env::CONF.keys.admin_api_key.as_bytes();
    let key = key.as_bytes();

    if correct_key.len() != key.len() || key.is_empty() {
        return Err(HttpErrorResponse::IncorrectCredential(String::from(
            "Invalid admin key",
        )));
    }

    // Do bitwise comparison to prevent timing attacks
    let mut keys_dont_match = 0u8;

    for (correct_key_byte, key_byte) in correct_key.iter().zip(key) {
        keys_dont_match |= correct_key_byte ^ key_byte;
    }

    if keys_dont_match != 0 {
        return Err(HttpErrorResponse::IncorrectCredential(String::from(
            "Invalid admin key",
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;
    use remindpay_common::service::subscription::SubscriptionManager;
    use remindpay_common::store::{MemoryStore, UserProfile};
    use rust_decimal_macros::dec;

    struct Fixture {
        store: MemoryStore,
        workflow: PaymentWorkflow,
        shared: Arc<dyn Store>,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let workflow = PaymentWorkflow::new(
            Arc::clone(&shared),
            SubscriptionManager::new(Arc::clone(&shared)),
        );

        Fixture {
            store,
            workflow,
            shared,
        }
    }

    async fn seed_pending_payment(fx: &Fixture) -> Uuid {
        let user_id = fx
            .store
            .get_or_create_user(42, &UserProfile::default())
            .await
            .unwrap();
        fx.workflow
            .create(user_id, dec!(199.00), 30)
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn test_update_status_requires_admin_key() {
        let fx = fixture();
        let payment_id = seed_pending_payment(&fx).await;

        let app = test::init_service(
            App::new()
                .app_data(Data::new(fx.workflow.clone()))
                .route("/payments/{payment_id}/status", web::post().to(update_status)),
        )
        .await;

        let req = TestRequest::post()
            .uri(&format!("/payments/{payment_id}/status"))
            .set_json(InputPaymentStatus {
                status: PaymentStatus::Succeeded,
                gateway_ref: None,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);

        let payment = fx.store.get_payment(payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[actix_web::test]
    async fn test_update_status_confirms_payment() {
        let fx = fixture();
        let payment_id = seed_pending_payment(&fx).await;

        let app = test::init_service(
            App::new()
                .app_data(Data::new(fx.workflow.clone()))
                .route("/payments/{payment_id}/status", web::post().to(update_status)),
        )
        .await;

        let req = TestRequest::post()
            .uri(&format!("/payments/{payment_id}/status"))
            .insert_header((ADMIN_KEY_HEADER, env::CONF.keys.admin_api_key.as_str()))
            .set_json(InputPaymentStatus {
                status: PaymentStatus::Succeeded,
                gateway_ref: Some(String::from("gw-123")),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

        let resp_body = test::read_body(resp).await;
        let resp_json: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(resp_json["status"], "succeeded");
        assert_eq!(resp_json["activated_premium"], true);

        let payment = fx.store.get_payment(payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(payment.gateway_ref.as_deref(), Some("gw-123"));
    }

    #[actix_web::test]
    async fn test_update_status_unknown_payment() {
        let fx = fixture();

        let app = test::init_service(
            App::new()
                .app_data(Data::new(fx.workflow.clone()))
                .route("/payments/{payment_id}/status", web::post().to(update_status)),
        )
        .await;

        let req = TestRequest::post()
            .uri(&format!("/payments/{}/status", Uuid::new_v4()))
            .insert_header((ADMIN_KEY_HEADER, env::CONF.keys.admin_api_key.as_str()))
            .set_json(InputPaymentStatus {
                status: PaymentStatus::Succeeded,
                gateway_ref: None,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_get_pending_lists_unconfirmed_payments() {
        let fx = fixture();
        let payment_id = seed_pending_payment(&fx).await;

        let app = test::init_service(
            App::new()
                .app_data(Data::new(Arc::clone(&fx.shared)))
                .route("/payments/pending", web::get().to(get_pending)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/payments/pending")
            .insert_header((ADMIN_KEY_HEADER, env::CONF.keys.admin_api_key.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

        let resp_body = test::read_body(resp).await;
        let resp_json: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        let payments = resp_json.as_array().unwrap();

        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0]["id"], payment_id.to_string());
        assert_eq!(payments[0]["status"], "pending");
    }
}
