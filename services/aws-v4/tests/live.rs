use std::env;

use anyhow::Result;
use awsauth_aws_v4::{RequestDescriptor, RequestExecutor, StaticCredentialProvider};
use awsauth_core::{Context, ErrorKind, OsEnv};
use awsauth_file_read_tokio::TokioFileRead;
use awsauth_http_send_reqwest::ReqwestHttpSend;
use http::{Method, StatusCode};
use log::{debug, warn};
use reqwest::Client;

fn init_executor() -> Option<(RequestExecutor, String)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("AWSAUTH_AWS_V4_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    let provider = StaticCredentialProvider::new(
        &env::var("AWSAUTH_AWS_V4_ACCESS_KEY").expect("env AWSAUTH_AWS_V4_ACCESS_KEY must set"),
        &env::var("AWSAUTH_AWS_V4_SECRET_KEY").expect("env AWSAUTH_AWS_V4_SECRET_KEY must set"),
    );
    let url = env::var("AWSAUTH_AWS_V4_URL").expect("env AWSAUTH_AWS_V4_URL must set");

    Some((RequestExecutor::new(ctx, provider), url))
}

#[tokio::test]
async fn test_head_missing_object() -> Result<()> {
    let Some((executor, url)) = init_executor() else {
        warn!("AWSAUTH_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let desc = RequestDescriptor::new(Method::HEAD, &format!("{url}/not_exist_file"))?;
    let err = executor.execute(&desc).await.unwrap_err();
    debug!("got error: {err:?}");
    assert_eq!(err.kind(), ErrorKind::HttpStatus);
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    Ok(())
}

#[tokio::test]
async fn test_list_objects() -> Result<()> {
    let Some((executor, url)) = init_executor() else {
        warn!("AWSAUTH_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let desc = RequestDescriptor::new(Method::GET, &format!("{url}?list-type=2&max-keys=1"))?;
    let resp = executor.execute(&desc).await?;
    debug!("got response: {resp:?}");
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_presigned_get() -> Result<()> {
    let Some((executor, url)) = init_executor() else {
        warn!("AWSAUTH_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let desc = RequestDescriptor::new(Method::GET, &format!("{url}/not_exist_file"))?;
    let presigned = executor.presign(&desc, None).await?;
    debug!("presigned url: {presigned}");

    let resp = Client::new().get(presigned).send().await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}
