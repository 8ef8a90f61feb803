use actix_web::web::*;

mod health;
mod payments;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/api")
            .configure(health::configure)
            .configure(payments::configure),
    );
}
