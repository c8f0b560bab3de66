use super::*;

pub(super) async fn access_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();
    info!(
        method = %method,
        uri = %uri,
        status = status.as_u16(),
        elapsed_ms = elapsed_ms,
        "http access"
    );
    response
}

pub(super) async fn healthz_handler() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

pub(super) async fn metrics_handler(State(state): State<AdminState>) -> impl IntoResponse {
    let metrics = format!(
        concat!(
            "roleplan_admin_uptime_seconds {}\n",
            "roleplan_admin_reads_total {}\n",
            "roleplan_admin_read_failures_total {}\n",
            "roleplan_admin_writes_total {}\n",
            "roleplan_admin_write_failures_total {}\n",
            "roleplan_admin_denied_total {}\n"
        ),
        state.metrics.started_at.elapsed().as_secs(),
        state.metrics.reads_total.load(Ordering::Relaxed),
        state.metrics.read_failures_total.load(Ordering::Relaxed),
        state.metrics.writes_total.load(Ordering::Relaxed),
        state.metrics.write_failures_total.load(Ordering::Relaxed),
        state.metrics.denied_total.load(Ordering::Relaxed),
    );
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics,
    )
}

pub(super) async fn get_role_allocations_handler(
    State(state): State<AdminState>,
    headers: HeaderMap,
) -> Result<Json<AllocationsResponse>, ApiError> {
    state.authorize(&headers).map_err(|err| forbidden(&err))?;

    match state.load().await {
        Ok(allocations) => {
            state.metrics.reads_total.fetch_add(1, Ordering::Relaxed);
            Ok(Json(AllocationsResponse {
                success: true,
                allocations,
            }))
        }
        Err(err) => {
            state
                .metrics
                .read_failures_total
                .fetch_add(1, Ordering::Relaxed);
            log_failure("read", &err);
            Err(read_failure(&err))
        }
    }
}

pub(super) async fn save_role_allocations_handler(
    State(state): State<AdminState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SaveResponse>, ApiError> {
    state.authorize(&headers).map_err(|err| forbidden(&err))?;

    let request = decode_save_request(&body).map_err(|err| {
        warn!(error = %err, "rejected role allocation update");
        save_failure(&err)
    })?;

    match state.save(request).await {
        Ok(data) => {
            state.metrics.writes_total.fetch_add(1, Ordering::Relaxed);
            Ok(Json(SaveResponse {
                success: true,
                message: "All templates updated successfully".to_string(),
                data,
            }))
        }
        Err(err) => {
            state
                .metrics
                .write_failures_total
                .fetch_add(1, Ordering::Relaxed);
            log_failure("save", &err);
            Err(save_failure(&err))
        }
    }
}

/// `tierData` must be present and a list before anything else in the body is
/// looked at.
fn decode_save_request(body: &[u8]) -> Result<SaveAllocationsRequest, AdminError> {
    let value = serde_json::from_slice::<serde_json::Value>(body)
        .map_err(|err| AdminError::Validation(format!("Invalid request body: {err}")))?;
    if !value.get("tierData").is_some_and(serde_json::Value::is_array) {
        return Err(AdminError::Validation(
            "Invalid tierData provided".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|err| AdminError::Validation(format!("Invalid request body: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_missing_or_scalar_tier_data() {
        for body in [
            r#"{}"#,
            r#"{"tierData": "nope"}"#,
            r#"{"tierData": {"activity": "x"}}"#,
            r#"{"tierData": null}"#,
        ] {
            let err = decode_save_request(body.as_bytes()).expect_err("body should be rejected");
            assert_eq!(err.to_string(), "Invalid tierData provided");
        }
    }

    #[test]
    fn decode_reports_malformed_json() {
        let err = decode_save_request(b"{tierData").expect_err("body should be rejected");
        assert!(matches!(err, AdminError::Validation(message) if message.starts_with("Invalid request body")));
    }

    #[test]
    fn decode_accepts_minimal_body() {
        let request = decode_save_request(br#"{"tierData": []}"#).expect("body should decode");
        assert!(request.tier_data.is_empty());
        assert!(request.effort_data.is_none());
    }
}
