use std::sync::OnceLock;

use apalis::{prelude::*, redis::RedisStorage};
use futures::future::{BoxFuture, FutureExt};

use super::email::Mailer;
use super::{MailJob, Notifier};
use crate::config::Config;
use crate::errors::CustomError;

static MAILER: OnceLock<Mailer> = OnceLock::new();

impl Job for MailJob {
    const NAME: &'static str = "send_email";
}

/// Sends one job. Failures are logged and the job is dropped, never retried.
async fn deliver(mailer: &Mailer, job: &MailJob) -> bool {
    match mailer.send(job).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Dropping email to {} without retry: {}", job.to, e);
            false
        }
    }
}

async fn process_email_job(job: MailJob, _ctx: JobContext) -> anyhow::Result<(), JobError> {
    log::info!("sending email to {:?}", &job.to);
    let Some(mailer) = MAILER.get() else {
        log::error!("Mailer is not configured, dropping email to {}", job.to);
        return Ok(());
    };
    deliver(mailer, &job).await;
    Ok(())
}

/// Producer side of the mail queue.
#[derive(Clone)]
pub struct MailQueue {
    storage: RedisStorage<MailJob>,
}

impl Notifier for MailQueue {
    fn dispatch(&self, job: MailJob) -> BoxFuture<'_, Result<(), CustomError>> {
        async move {
            log::info!("Queueing email to {}", job.to);
            let mut sender = self.storage.clone();
            if let Err(e) = sender.push(job).await {
                log::error!("Failed to push email to queue: {}", e);
                return Err(CustomError::MailDeliveryFailure);
            }
            Ok(())
        }
        .boxed()
    }
}

pub async fn start_processing_email_queue(
    config: &Config,
    mailer: Mailer,
) -> anyhow::Result<MailQueue> {
    if MAILER.set(mailer).is_err() {
        anyhow::bail!("email queue already started");
    }

    let storage = RedisStorage::connect(config.redis_url.clone()).await?;
    log::info!("Connected to redis");
    log::info!("Starting email job handler");

    // create job monitor(s) and attach email job handler
    let monitor = Monitor::new().register_with_count(2, {
        let storage = storage.clone();
        move |n| {
            WorkerBuilder::new(format!("job-handler-{n}"))
                .with_storage(storage.clone())
                .build_fn(process_email_job)
        }
    });

    // spawn job monitor into background
    // the monitor manages itself otherwise so we don't need to return a join handle
    #[allow(clippy::let_underscore_future)]
    let _ = tokio::spawn(monitor.run());

    Ok(MailQueue { storage })
}
