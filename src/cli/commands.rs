use std::{future::Future, time::Duration};

use actix::System;
use anyhow::Context as _;
use futures::{
    channel::oneshot,
    future::{self, Either},
};
use web3::types::H160;

use auditor_client::{
    reputation::ReputationPair,
    submission::{parse_recipient, SubmissionRequest},
    Session,
};
use auditor_config::Config;

use super::{view, Command, TERM_WIDTH};

pub(super) fn exec_cmd(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::Register {
            to,
            amount,
            description,
            category,
        } => register(
            config,
            SubmissionRequest {
                recipient: to,
                amount,
                description,
                category,
            },
        ),
        Command::Watch {
            interval_ms,
            user,
            auditor,
            json,
        } => {
            let user = user.as_deref().map(parse_recipient).transpose()?;
            let auditor = auditor.as_deref().map(parse_recipient).transpose()?;

            watch(config, Duration::from_millis(interval_ms), user, auditor, json)
        }
        Command::Reputation {
            user,
            auditor,
            json,
        } => {
            let user = parse_recipient(&user)?;
            let auditor = auditor.as_deref().map(parse_recipient).transpose()?;

            System::new().block_on(show_reputation(config, user, auditor, json))
        }
        Command::Networks => {
            println!("{}", view::render_networks(&config));

            Ok(())
        }
    }
}

fn register(config: Config, request: SubmissionRequest) -> anyhow::Result<()> {
    // Bad input is reported before connecting to the wallet
    request.validate().context("Invalid transaction")?;

    System::new().block_on(register_and_confirm(config, request))
}

async fn register_and_confirm(config: Config, request: SubmissionRequest) -> anyhow::Result<()> {
    let mut session = Session::connect(&config).await?;
    let receipt = session
        .register(&request)
        .await
        .context("Transaction registration failed")?;

    println!("{}", view::render_receipt(&receipt));

    Ok(())
}

async fn show_reputation(
    config: Config,
    user: H160,
    auditor: Option<H160>,
    json: bool,
) -> anyhow::Result<()> {
    let session = Session::connect(&config).await?;
    let pair = fetch_reputation(&session, user, auditor).await?;

    if json {
        println!("{}", serde_json::to_string(&pair)?);
    } else {
        println!("{}", view::render_reputation(&pair, *TERM_WIDTH));
    }

    Ok(())
}

async fn fetch_reputation(
    session: &Session,
    user: H160,
    auditor: Option<H160>,
) -> anyhow::Result<ReputationPair> {
    let auditor = match auditor {
        Some(auditor) => auditor,
        None => session.binding().signer()?.account()?,
    };

    Ok(session.reputation(user, auditor).await?)
}

fn watch(
    config: Config,
    interval: Duration,
    user: Option<H160>,
    auditor: Option<H160>,
    json: bool,
) -> anyhow::Result<()> {
    let (interrupt_tx, interrupt_rx) = oneshot::channel();
    let mut interrupt_tx = Some(interrupt_tx);
    ctrlc::set_handler(move || {
        if let Some(tx) = interrupt_tx.take() {
            // The receiver is gone once the watch loop has ended
            let _ = tx.send(());
        }
    })
    .context("Error setting handler for both SIGINT (Ctrl+C) and SIGTERM (kill)")?;

    System::new().block_on(until_interrupted(
        follow(config, interval, user, auditor, json),
        interrupt_rx,
    ))
}

/// Run `task` until it finishes or `interrupt` fires. On interruption the task is dropped, which
/// releases the session it owns along with its subscriptions.
async fn until_interrupted<F>(task: F, interrupt: oneshot::Receiver<()>) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    match future::select(Box::pin(task), interrupt).await {
        Either::Left((res, _)) => res,
        Either::Right((Ok(()), task)) => {
            drop(task);
            log::info!("Closing auditor");

            Ok(())
        }
        Either::Right((Err(oneshot::Canceled), task)) => task.await,
    }
}

async fn follow(
    config: Config,
    interval: Duration,
    user: Option<H160>,
    auditor: Option<H160>,
    json: bool,
) -> anyhow::Result<()> {
    let mut session = Session::connect(&config).await?;
    session.mount();
    log::info!(
        "Following transactions registered in contract {:?}",
        session.binding().address()
    );

    let mut rendered_len = None;
    loop {
        let transactions = session.transactions().await;
        if rendered_len != Some(transactions.len()) {
            rendered_len = Some(transactions.len());

            if json {
                println!("{}", serde_json::to_string(&transactions)?);
            } else {
                let reputation = match user {
                    Some(user) => match fetch_reputation(&session, user, auditor).await {
                        Ok(pair) => Some(pair),
                        Err(e) => {
                            log::warn!("Unable to fetch reputation scores: {:#}", e);
                            None
                        }
                    },
                    None => None,
                };
                println!(
                    "{}",
                    view::render(&transactions, reputation.as_ref(), *TERM_WIDTH)
                );
            }
        }

        actix::clock::sleep(interval).await;
    }
}
