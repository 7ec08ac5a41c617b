//! The dispatch loop.
//!
//! One task owns both channel inboxes and every store call. It waits until
//! at least one channel has a message, serves one message from each ready
//! channel, and goes back to waiting. Nothing a single message does can stop
//! the loop: every failure ends in a sentinel reply, a log line, or both.

use bytes::Bytes;
use nbs_protocol::{preview, Command, DecodeError, Query, Reply};
use nbs_store::{BlobKey, BlobStore, Namespace, StoreError};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, warn};

use crate::context::ServerContext;
use crate::socket::{CommandInbox, QueryInbox, QueryRequest};

const COMMAND: &str = "command";
const QUERY: &str = "query";

enum Ready {
    Command(Option<Vec<Bytes>>),
    Query(Option<QueryRequest>),
}

pub struct Dispatcher<'a, S: BlobStore> {
    ctx: &'a ServerContext<S>,
}

impl<'a, S: BlobStore> Dispatcher<'a, S> {
    /// Dispatch against `ctx`.
    pub fn new(ctx: &'a ServerContext<S>) -> Self {
        Self { ctx }
    }

    /// Serve both channels until both inboxes are closed.
    pub async fn run(&self, commands: &mut CommandInbox, queries: &mut QueryInbox) {
        let mut commands_open = true;
        let mut queries_open = true;

        while commands_open || queries_open {
            let ready = tokio::select! {
                msg = commands.recv(), if commands_open => Ready::Command(msg),
                req = queries.recv(), if queries_open => Ready::Query(req),
            };

            match ready {
                Ready::Command(Some(parts)) => {
                    self.handle_command(&parts);
                    if queries_open {
                        queries_open = self.serve_pending_query(queries);
                    }
                }
                Ready::Query(Some(request)) => {
                    self.answer(request);
                    if commands_open {
                        commands_open = self.serve_pending_command(commands);
                    }
                }
                Ready::Command(None) => commands_open = false,
                Ready::Query(None) => queries_open = false,
            }
        }
        debug!("all channels closed; dispatcher stopping");
    }

    /// Serve a query that is already waiting. Returns whether the inbox is
    /// still open.
    fn serve_pending_query(&self, queries: &mut QueryInbox) -> bool {
        match queries.try_recv() {
            Ok(request) => {
                self.answer(request);
                true
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => false,
        }
    }

    fn serve_pending_command(&self, commands: &mut CommandInbox) -> bool {
        match commands.try_recv() {
            Ok(parts) => {
                self.handle_command(&parts);
                true
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => false,
        }
    }

    fn answer(&self, request: QueryRequest) {
        let reply = self.handle_query(&request.parts);
        request.respond(reply);
    }

    /// Apply one command-channel message. Commands have no reply path, so
    /// every failure is logged and dropped.
    pub fn handle_command(&self, parts: &[Bytes]) {
        let command = match Command::decode(parts) {
            Ok(command) => command,
            Err(e) => return reject(COMMAND, parts, &e),
        };
        let verb = command.verb().as_str();
        debug!(channel = COMMAND, verb, "dispatching");

        match command {
            Command::Save { namespace, name, content } => {
                let Some(key) = valid_key(COMMAND, verb, &namespace, &name) else {
                    return;
                };
                if let Err(e) = self.ctx.store().save(&key, &content) {
                    warn!(%key, error = %e, "save failed");
                }
            }
            Command::Delete { namespace, name } => {
                let Some(key) = valid_key(COMMAND, verb, &namespace, &name) else {
                    return;
                };
                match self.ctx.store().delete(&key) {
                    Ok(true) => {}
                    Ok(false) => debug!(%key, "delete of missing blob ignored"),
                    Err(e) => warn!(%key, error = %e, "delete failed"),
                }
            }
            Command::DeleteAll { namespace } => {
                let namespace = match Namespace::parse(&namespace) {
                    Ok(ns) => ns,
                    Err(e) => return invalid_key(COMMAND, verb, &e),
                };
                match self.ctx.store().delete_all(&namespace) {
                    // The wipe finishes on its own; nothing waits for it.
                    Ok(Some(_wipe)) => {}
                    Ok(None) => debug!(%namespace, "delete of missing namespace ignored"),
                    Err(e) => warn!(%namespace, error = %e, "namespace wipe failed to start"),
                }
            }
        }
    }

    /// Answer one query-channel message. Always produces exactly one reply.
    pub fn handle_query(&self, parts: &[Bytes]) -> Reply {
        let query = match Query::decode(parts) {
            Ok(query) => query,
            Err(e) => {
                reject(QUERY, parts, &e);
                return Reply::Error;
            }
        };
        let verb = query.verb().as_str();
        debug!(channel = QUERY, verb, "dispatching");

        match query {
            Query::Load { namespace, name } => {
                let Some(key) = valid_key(QUERY, verb, &namespace, &name) else {
                    return Reply::Error;
                };
                match self.ctx.store().load(&key) {
                    Ok(Some(data)) => Reply::Blob(Bytes::from(data)),
                    Ok(None) => Reply::Error,
                    Err(e) => {
                        warn!(%key, error = %e, "load failed");
                        Reply::Error
                    }
                }
            }
            Query::Contains { namespace, name } => {
                // An invalid key can never name a stored blob.
                let Some(key) = valid_key(QUERY, verb, &namespace, &name) else {
                    return Reply::Absent;
                };
                match self.ctx.store().contains(&key) {
                    Ok(true) => Reply::Present,
                    Ok(false) => Reply::Absent,
                    Err(e) => {
                        warn!(%key, error = %e, "existence check failed");
                        Reply::Absent
                    }
                }
            }
        }
    }
}

fn reject(channel: &'static str, parts: &[Bytes], error: &DecodeError) {
    let args = parts.get(1..).map(preview).unwrap_or_default();
    match error {
        DecodeError::Empty => warn!(channel, "empty message"),
        DecodeError::UnknownVerb { verb } => {
            warn!(channel, verb = %verb, args = %args, "unknown input")
        }
        DecodeError::Arity { .. } => warn!(channel, args = %args, "{error}"),
    }
}

fn valid_key(channel: &'static str, verb: &'static str, namespace: &Bytes, name: &Bytes) -> Option<BlobKey> {
    match BlobKey::parse(namespace, name) {
        Ok(key) => Some(key),
        Err(e) => {
            invalid_key(channel, verb, &e);
            None
        }
    }
}

fn invalid_key(channel: &'static str, verb: &'static str, error: &StoreError) {
    warn!(channel, verb, error = %error, "rejected key");
}
