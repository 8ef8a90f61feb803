use actix_web::web::*;

use crate::handlers::payment;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/payments")
            .route("/pending", get().to(payment::get_pending))
            .route("/{payment_id}/status", post().to(payment::update_status)),
    );
}
