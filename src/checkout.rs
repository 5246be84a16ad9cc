//! The storm action: one checkout attempt against the provisioned product.

use std::time::Instant;

use reqwest::Client;
use serde::Serialize;

use crate::metric::{Attempt, AttemptStatus};
use crate::provision::RaceContext;

#[derive(Serialize)]
struct CheckoutRequest<'a> {
    product_id: &'a str,
    quantity: u32,
}

/// Issue one purchase attempt for a single unit and record what happened.
///
/// Never fails: a transport-level breakdown becomes an
/// [`AttemptStatus::Transport`] marker and the client carries on. Statuses
/// outside the expected accepted/rejected pair are logged with their body so
/// a misbehaving backend can be diagnosed, but they still count as errors,
/// never dropped.
pub async fn checkout_attempt(client: &Client, race: &RaceContext, client_index: usize) -> Attempt {
    let started = Instant::now();
    let sent = client
        .post(format!("{}/api/v1/checkouts/", race.base_url))
        .bearer_auth(&race.token)
        .json(&CheckoutRequest {
            product_id: &race.product_id,
            quantity: 1,
        })
        .send()
        .await;
    let latency = started.elapsed();

    let status = match sent {
        Ok(response) => {
            let code = response.status().as_u16();
            if code != 202 && code != 400 {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(client = client_index, status = code, body = %body, "Unexpected checkout status");
            }
            AttemptStatus::Http(code)
        }
        Err(e) => {
            tracing::warn!(client = client_index, "Checkout transport failure: {e}");
            AttemptStatus::Transport
        }
    };

    Attempt {
        client: client_index,
        status,
        latency,
    }
}
