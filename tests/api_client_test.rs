use anyhow::Result;
use contract_invoicer::core::BackendApi;
use contract_invoicer::domain::model::{
    ContractSource, Frequency, GenerateInvoiceRequest, InvoiceStatus, Session,
};
use contract_invoicer::{ApiClient, AppError};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

fn session() -> Session {
    Session {
        access_token: "tok-abc".to_string(),
        email: "ops@example.com".to_string(),
        issued_at: chrono::Utc::now(),
    }
}

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.url("/api"), Duration::from_secs(5))
        .unwrap()
        .with_session(Some(&session()))
}

#[tokio::test]
async fn test_login_returns_session() -> Result<()> {
    let server = MockServer::start();
    let login_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/auth/login")
            .json_body(json!({"email": "ops@example.com", "password": "hunter2"}));
        then.status(200).json_body(json!({
            "access_token": "fresh-token",
            "token_type": "bearer",
            "user": {"email": "ops@example.com", "name": "Ops"}
        }));
    });

    let api = ApiClient::new(&server.url("/api"), Duration::from_secs(5))?;
    assert!(!api.has_token());
    let session = api.login("ops@example.com", "hunter2").await?;

    login_mock.assert();
    assert_eq!(session.access_token, "fresh-token");
    assert_eq!(session.email, "ops@example.com");
    Ok(())
}

#[tokio::test]
async fn test_list_contracts_sends_bearer_and_decodes_sources() -> Result<()> {
    let server = MockServer::start();
    let contracts_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/contracts")
            .header("authorization", "Bearer tok-abc");
        then.status(200).json_body(json!({
            "contracts": [
                {"source": "manual", "id": "c-1", "name": "Shop lease", "rent_amount": 2400.0},
                {"source": "mcp", "id": "c-2", "name": "Drive lease", "drive_file_id": "1XyZ"},
                {"id": "c-3", "name": "Legacy upload"}
            ],
            "total": 3
        }));
    });

    let contracts = client(&server).list_contracts().await?;

    contracts_mock.assert();
    let sources: Vec<ContractSource> = contracts.iter().map(|c| c.source()).collect();
    assert_eq!(
        sources,
        vec![ContractSource::Manual, ContractSource::Mcp, ContractSource::Manual]
    );
    assert_eq!(contracts[0].rent_amount(), Some(2400.0));
    Ok(())
}

#[tokio::test]
async fn test_missing_session_fails_before_request() {
    let server = MockServer::start();
    let contracts_mock = server.mock(|when, then| {
        when.method(GET).path("/api/contracts");
        then.status(200).json_body(json!([]));
    });

    let api = ApiClient::new(&server.url("/api"), Duration::from_secs(5)).unwrap();
    let err = api.list_contracts().await.unwrap_err();

    assert!(matches!(err, AppError::NotAuthenticated));
    contracts_mock.assert_hits(0);
}

#[tokio::test]
async fn test_expired_token_maps_to_session_expired() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/invoices");
        then.status(401)
            .json_body(json!({"detail": {"code": "token_expired", "message": "expired"}}));
    });

    let err = client(&server).list_invoices(None).await.unwrap_err();
    match err {
        AppError::SessionExpired { code } => assert_eq!(code, "token_expired"),
        other => panic!("expected SessionExpired, got {:?}", other),
    }
}

#[tokio::test]
async fn test_plain_unauthorized_keeps_status_and_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/schedules");
        then.status(401).body("wrong credentials");
    });

    let err = client(&server).list_schedules().await.unwrap_err();
    match err {
        AppError::HttpError { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "wrong credentials");
        }
        other => panic!("expected HttpError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start();
    let generate_mock = server.mock(|when, then| {
        when.method(POST).path("/api/invoices/generate");
        then.status(500).json_body(json!({"error": "renderer crashed"}));
    });

    let err = client(&server)
        .generate_invoice(&GenerateInvoiceRequest::for_contract("c-1"))
        .await
        .unwrap_err();

    generate_mock.assert_hits(1);
    assert_eq!(err.status(), Some(500));
    assert!(err.user_friendly_message().contains("renderer crashed"));
}

#[tokio::test]
async fn test_generate_invoice_posts_request() -> Result<()> {
    let server = MockServer::start();
    let generate_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/invoices/generate")
            .header("authorization", "Bearer tok-abc")
            .json_body(json!({"contract_id": "c-1", "template": "modern", "due_date": "2025-04-01"}));
        then.status(201).json_body(json!({
            "invoice": {
                "id": "inv-77",
                "contract_id": "c-1",
                "invoice_number": "2025-0077",
                "amount": 2400.0,
                "currency": "EUR",
                "due_date": "2025-04-01",
                "status": "issued"
            }
        }));
    });

    let request = GenerateInvoiceRequest {
        template: Some("modern".to_string()),
        due_date: chrono::NaiveDate::from_ymd_opt(2025, 4, 1),
        ..GenerateInvoiceRequest::for_contract("c-1")
    };
    let invoice = client(&server).generate_invoice(&request).await?;

    generate_mock.assert();
    assert_eq!(invoice.id, "inv-77");
    assert_eq!(invoice.status, InvoiceStatus::Issued);
    assert_eq!(invoice.pdf_file_name(), "invoice-2025-0077.pdf");
    Ok(())
}

#[tokio::test]
async fn test_list_invoices_filters_by_contract() -> Result<()> {
    let server = MockServer::start();
    let invoices_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/invoices")
            .query_param("contract_id", "c-9");
        then.status(200).json_body(json!([
            {"id": "inv-1", "contract_id": "c-9", "amount": 10.0}
        ]));
    });

    let invoices = client(&server).list_invoices(Some("c-9")).await?;

    invoices_mock.assert();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].status, InvoiceStatus::Draft);
    Ok(())
}

#[tokio::test]
async fn test_upload_contract_uses_multipart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("lease.pdf");
    std::fs::write(&file, b"%PDF-1.4 lease body")?;

    let server = MockServer::start();
    let upload_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/contracts/upload")
            .header_exists("content-type")
            .body_contains("filename=\"lease.pdf\"")
            .body_contains("%PDF-1.4 lease body");
        then.status(200).json_body(json!({
            "contract": {"id": "c-55", "name": "lease.pdf", "file_url": "/files/c-55.pdf"}
        }));
    });

    let contract = client(&server).upload_contract(&file).await?;

    upload_mock.assert();
    assert_eq!(contract.id(), "c-55");
    assert_eq!(contract.source(), ContractSource::Manual);
    Ok(())
}

#[tokio::test]
async fn test_mcp_sync_tags_contracts() -> Result<()> {
    let server = MockServer::start();
    let sync_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/mcp/sync")
            .json_body(json!({"folder_id": "folder-1"}));
        then.status(200).json_body(json!({
            "synced": 1,
            "contracts": [{"id": "d-1", "name": "Drive lease", "drive_file_id": "abc"}]
        }));
    });

    let contracts = client(&server).sync_mcp_contracts(Some("folder-1")).await?;

    sync_mock.assert();
    assert_eq!(contracts.len(), 1);
    assert_eq!(contracts[0].source(), ContractSource::Mcp);
    Ok(())
}

#[tokio::test]
async fn test_download_pdf_returns_bytes() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/invoices/inv-1/pdf");
        then.status(200)
            .header("content-type", "application/pdf")
            .body("%PDF-1.7 binary");
    });

    let bytes = client(&server).download_invoice_pdf("inv-1").await?;
    assert_eq!(bytes, b"%PDF-1.7 binary");
    Ok(())
}

#[tokio::test]
async fn test_schedules_and_extraction_endpoints() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/schedules");
        then.status(200).json_body(json!([{
            "id": "s-1",
            "contract_id": "c-1",
            "start_date": "2025-01-01",
            "frequency": "quarterly",
            "reminder_days_before_due": [7]
        }]));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/schedules/extract")
            .json_body(json!({"contract_id": "c-1"}));
        then.status(200).json_body(json!({
            "schedules": [
                {"id": "x-1", "contract_id": "c-1", "start_date": "2025-02-01", "frequency": "monthly"},
                {"id": "x-2", "reminder_days": "not-a-list"}
            ]
        }));
    });

    let api = client(&server);
    let schedules = api.list_schedules().await?;
    assert_eq!(schedules[0].frequency, Frequency::Quarterly);
    assert_eq!(schedules[0].reminder_days_before_due, vec![7]);

    let extracted = api.extract_schedules(Some("c-1")).await?;
    assert_eq!(extracted.len(), 1);
    assert_eq!(extracted[0].id.as_deref(), Some("x-1"));
    Ok(())
}

#[tokio::test]
async fn test_list_contracts_skips_malformed_entries() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/contracts");
        then.status(200)
            .json_body(json!([{"id": "c-1", "name": "ok"}, {"id": "c-2"}]));
    });

    let contracts = client(&server).list_contracts().await?;
    assert_eq!(contracts.len(), 1);
    assert_eq!(contracts[0].id(), "c-1");
    assert_eq!(contracts[0].source(), ContractSource::Manual);
    Ok(())
}
