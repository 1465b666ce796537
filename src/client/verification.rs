use futures::future::{BoxFuture, FutureExt};

use super::api::{AuthClient, ClientError};
use super::cooldown::ResendCooldown;
use super::otp_form::OtpForm;
use crate::routes::authentication::models::UserResponse;

/// Network side of the verification screen.
pub trait OtpBackend: Send + Sync {
    fn send_code(&self) -> BoxFuture<'_, Result<String, ClientError>>;
    fn verify_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<UserResponse, ClientError>>;
}

impl OtpBackend for AuthClient {
    fn send_code(&self) -> BoxFuture<'_, Result<String, ClientError>> {
        self.generate_otp().boxed()
    }

    fn verify_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<UserResponse, ClientError>> {
        self.verify_otp(code).boxed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A toast shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

pub struct OtpVerification<B> {
    backend: B,
    pub form: OtpForm,
    cooldown: ResendCooldown,
    verified: Option<UserResponse>,
}

impl<B: OtpBackend> OtpVerification<B> {
    /// Opens the screen right after a code was mailed, so the resend
    /// cooldown is already running.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            form: OtpForm::new(),
            cooldown: ResendCooldown::start(),
            verified: None,
        }
    }

    pub fn cooldown(&self) -> &ResendCooldown {
        &self.cooldown
    }

    pub fn verified_user(&self) -> Option<&UserResponse> {
        self.verified.as_ref()
    }

    pub async fn submit(&mut self) -> Notice {
        if !self.form.can_submit() {
            return Notice::error("Please enter the complete 6-digit OTP");
        }
        let code = self.form.code();
        match self.backend.verify_code(&code).await {
            Ok(user) => {
                self.verified = Some(user);
                self.cooldown = ResendCooldown::idle();
                Notice::success("Email verified successfully")
            }
            Err(e) => Notice::error(e.to_string()),
        }
    }

    /// Returns `None` while the cooldown is still running or once the email
    /// is verified.
    pub async fn resend(&mut self) -> Option<Notice> {
        if self.verified.is_some() || !self.cooldown.can_resend() {
            return None;
        }
        let notice = match self.backend.send_code().await {
            Ok(_) => {
                self.cooldown.restart();
                self.form.clear();
                Notice::success("New OTP sent to your email")
            }
            Err(e) => Notice::error(e.to_string()),
        };
        Some(notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;
    use tokio::time::{sleep, Duration};

    #[derive(Default)]
    struct FakeBackend {
        sent: AtomicUsize,
        submitted: Mutex<Vec<String>>,
    }

    impl OtpBackend for FakeBackend {
        fn send_code(&self) -> BoxFuture<'_, Result<String, ClientError>> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            async { Ok("OTP sent to your email".to_string()) }.boxed()
        }

        fn verify_code<'a>(
            &'a self,
            code: &'a str,
        ) -> BoxFuture<'a, Result<UserResponse, ClientError>> {
            self.submitted.lock().unwrap().push(code.to_string());
            let result = if code == "482913" {
                Ok(UserResponse {
                    id: uuid::Uuid::new_v4(),
                    full_name: "Ada Lovelace".to_string(),
                    email: "ada@example.com".to_string(),
                    verified: true,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            } else {
                Err(ClientError::Api {
                    status: 400,
                    message: "Invalid verification code".to_string(),
                })
            };
            async move { result }.boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn incomplete_code_is_not_sent() {
        let mut screen = OtpVerification::new(FakeBackend::default());
        screen.form.paste("123");

        let notice = screen.submit().await;
        assert_eq!(notice, Notice::error("Please enter the complete 6-digit OTP"));
        assert!(screen.backend.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_reports_server_outcome() {
        let mut screen = OtpVerification::new(FakeBackend::default());
        screen.form.paste("000000");
        assert_eq!(
            screen.submit().await,
            Notice::error("Invalid verification code")
        );
        assert!(screen.verified_user().is_none());

        screen.form.paste("482913");
        assert_eq!(screen.submit().await.kind, NoticeKind::Success);
        assert!(screen.verified_user().unwrap().verified);
    }

    #[tokio::test(start_paused = true)]
    async fn verification_stops_the_countdown() {
        let mut screen = OtpVerification::new(FakeBackend::default());
        let mut countdown = screen.cooldown().subscribe();
        screen.form.paste("482913");
        assert_eq!(screen.submit().await.kind, NoticeKind::Success);

        assert!(countdown.changed().await.is_err());
        assert_eq!(screen.cooldown().remaining(), 0);
        assert_eq!(screen.resend().await, None);
        assert_eq!(screen.backend.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn resend_waits_for_cooldown() {
        let mut screen = OtpVerification::new(FakeBackend::default());
        screen.form.paste("111111");
        assert_eq!(screen.resend().await, None);
        assert_eq!(screen.backend.sent.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(31)).await;
        assert_eq!(
            screen.resend().await,
            Some(Notice::success("New OTP sent to your email"))
        );
        assert_eq!(screen.backend.sent.load(Ordering::SeqCst), 1);
        assert_eq!(screen.form.code(), "");
        assert!(!screen.cooldown().can_resend());
    }
}
