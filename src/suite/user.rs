//! Account creation checks against `/create/<username>`.

use anyhow::{bail, ensure, Context};
use async_trait::async_trait;
use reqwest::StatusCode;

use super::{Suite, TestCase};
use crate::api::{ApiError, UserApiClient, USER_FIELDS};

pub struct UserSuiteContext {
    pub api: UserApiClient,
    pub username: String,
}

/// Creation first, then the duplicate: the second case depends on the
/// user made by the first.
pub fn suite() -> Suite<UserSuiteContext> {
    Suite::new("base_user")
        .case(CreateUser)
        .case(DuplicateCreation)
}

pub struct CreateUser;

#[async_trait]
impl TestCase<UserSuiteContext> for CreateUser {
    fn name(&self) -> &str {
        "test_01_creation"
    }

    async fn run(&self, ctx: &UserSuiteContext) -> anyhow::Result<()> {
        let response = ctx.api.create_user(&ctx.username).await?;

        ensure!(
            response.status == StatusCode::OK,
            "expected HTTP 200, got {}",
            response.status
        );
        ensure!(
            response.has_exact_user_fields(),
            "expected fields {:?}, got {:?}",
            USER_FIELDS,
            response.field_names()
        );

        let user = response.user().context("user body did not decode")?;
        ensure!(
            user.username == ctx.username,
            "expected username {:?}, got {:?}",
            ctx.username,
            user.username
        );
        ensure!(
            user.is_normal(),
            "new user should be active (status 1), got status {}",
            user.status
        );
        Ok(())
    }
}

pub struct DuplicateCreation;

#[async_trait]
impl TestCase<UserSuiteContext> for DuplicateCreation {
    fn name(&self) -> &str {
        "test_02_duplicate_user_creation"
    }

    async fn run(&self, ctx: &UserSuiteContext) -> anyhow::Result<()> {
        match ctx.api.create_user(&ctx.username).await {
            Err(ApiError::Status { status, .. }) => {
                log::debug!("duplicate {} rejected with HTTP {}", ctx.username, status);
                Ok(())
            }
            Ok(response) => bail!(
                "duplicate username {:?} was accepted with HTTP {}",
                ctx.username,
                response.status
            ),
            Err(e) => Err(e).context("expected an HTTP error status"),
        }
    }
}
