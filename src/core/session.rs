use crate::core::gate::ResumeGate;
use crate::domain::ports::{BrowserDriver, SessionHandle, SessionMode};
use crate::utils::error::Result;

/// Opens a browser session and, if the login flow stopped on a human check,
/// blocks on the gate until an operator resumes.
pub async fn open_session(
    driver: &dyn BrowserDriver,
    mode: SessionMode,
    gate: Option<&ResumeGate>,
) -> Result<SessionHandle> {
    let session = driver.open_session(mode).await?;
    tracing::debug!("Opened {:?} session {}", mode, session.id);

    if session.needs_verification {
        match gate {
            Some(gate) => {
                if let Err(e) = gate
                    .wait("Browser session needs manual verification (solve the CAPTCHA in the browser)")
                    .await
                {
                    release_session(driver, &session).await;
                    return Err(e.into());
                }
            }
            None => tracing::warn!(
                "Session {} needs manual verification but no resume gate is configured",
                session.id
            ),
        }
    }
    Ok(session)
}

/// Best-effort teardown; failures are logged and never escalated.
pub async fn release_session(driver: &dyn BrowserDriver, session: &SessionHandle) {
    if let Err(e) = driver.close_session(session).await {
        tracing::info!("Browser close error for session {}: {}", session.id, e);
    }
}
