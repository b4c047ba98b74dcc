use std::{
	fmt::{Display, Formatter},
	sync::Arc,
	time::Duration as StdDuration,
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tokio::{sync::Mutex, task::JoinHandle, time as tokio_time};
use uuid::Uuid;

use crate::{Error, Result};
use cdr_backend::{BackendPage, ContinuationToken, SearchBackend};
use cdr_domain::IndexName;

/// Opaque handle a client presents to continue a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorHandle(Uuid);
impl CursorHandle {
	fn generate() -> Self {
		Self(Uuid::new_v4())
	}

	/// `None` for strings that were never issued as handles.
	pub fn parse(raw: &str) -> Option<Self> {
		Uuid::parse_str(raw.trim()).ok().map(Self)
	}
}
impl Display for CursorHandle {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(&self.0, f)
	}
}

#[derive(Debug)]
pub struct ScrollPage {
	pub total: u64,
	pub hits: Vec<Value>,
	/// `None` once the result set is exhausted.
	pub cursor: Option<CursorHandle>,
}

/// Snapshot of an open cursor, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct CursorInfo {
	pub tenant: String,
	pub index: IndexName,
	/// Tenant-scoped body the sequence was opened with.
	pub query: Value,
	#[serde(with = "time::serde::timestamp")]
	pub created_at: OffsetDateTime,
}

/// What every handle in one scroll sequence shares.
#[derive(Debug)]
struct CursorOrigin {
	tenant: String,
	index: IndexName,
	query: Value,
	created_at: OffsetDateTime,
}

struct CursorSlot {
	origin: Arc<CursorOrigin>,
	state: Mutex<CursorState>,
}

struct CursorState {
	token: Option<ContinuationToken>,
	last_used: OffsetDateTime,
	closed: bool,
}
impl CursorState {
	fn idle_past(&self, now: OffsetDateTime, idle_timeout: Duration) -> bool {
		now - self.last_used > idle_timeout
	}
}

/// Server-side scroll cursors.
///
/// Each handle is single-use: a successful advance closes the presented handle and issues a
/// successor bound to the next continuation token. Advances on one handle are serialized by
/// the slot mutex; a contending caller fails fast with `CursorBusy`.
pub struct ScrollCursorManager {
	backend: Arc<dyn SearchBackend>,
	cursors: DashMap<CursorHandle, Arc<CursorSlot>>,
	idle_timeout: Duration,
}
impl ScrollCursorManager {
	pub fn new(backend: Arc<dyn SearchBackend>, idle_timeout: Duration) -> Self {
		Self { backend, cursors: DashMap::new(), idle_timeout }
	}

	pub fn open_cursors(&self) -> usize {
		self.cursors.len()
	}

	pub fn is_open(&self, handle: CursorHandle) -> bool {
		self.cursors.contains_key(&handle)
	}

	pub fn describe(&self, handle: CursorHandle) -> Option<CursorInfo> {
		self.slot(handle).map(|slot| CursorInfo {
			tenant: slot.origin.tenant.clone(),
			index: slot.origin.index.clone(),
			query: slot.origin.query.clone(),
			created_at: slot.origin.created_at,
		})
	}

	pub async fn open(
		&self,
		tenant: &str,
		index: IndexName,
		query: Value,
		page_size: u32,
	) -> Result<ScrollPage> {
		let page = self.backend.execute_query(&index, &query, page_size).await?;
		let BackendPage { total, hits, continuation } = page;
		let cursor = continuation.map(|token| {
			let now = OffsetDateTime::now_utc();
			let origin = Arc::new(CursorOrigin {
				tenant: tenant.to_string(),
				index,
				query,
				created_at: now,
			});

			self.register(origin, token, now)
		});

		if let Some(handle) = cursor {
			tracing::debug!(%handle, tenant, total, "Opened scroll cursor.");
		}

		Ok(ScrollPage { total, hits, cursor })
	}

	pub async fn advance(&self, tenant: &str, handle: CursorHandle) -> Result<ScrollPage> {
		self.advance_at(tenant, handle, OffsetDateTime::now_utc()).await
	}

	pub async fn advance_at(
		&self,
		tenant: &str,
		handle: CursorHandle,
		now: OffsetDateTime,
	) -> Result<ScrollPage> {
		let slot = self.slot(handle).ok_or_else(|| expired(handle))?;

		if slot.origin.tenant != tenant {
			tracing::warn!(%handle, tenant, "Rejected cross-tenant scroll advance.");

			return Err(Error::Forbidden {
				message: "Scroll cursor belongs to another tenant.".to_string(),
			});
		}

		let mut state = slot.state.try_lock().map_err(|_| Error::CursorBusy {
			message: format!("Scroll cursor {handle} is already being advanced."),
		})?;

		if state.closed {
			return Err(expired(handle));
		}
		if state.idle_past(now, self.idle_timeout) {
			let token = state.token.take();

			state.closed = true;
			self.forget(handle, &slot);
			drop(state);

			if let Some(token) = token {
				self.release_quietly(token).await;
			}

			return Err(expired(handle));
		}

		let Some(token) = state.token.take() else {
			state.closed = true;
			self.forget(handle, &slot);

			return Err(expired(handle));
		};
		let mut in_flight = InFlightAdvance { manager: self, handle, slot: &slot, settled: false };
		let result = self.backend.continue_query(token).await;

		in_flight.settled = true;
		state.closed = true;
		self.forget(handle, &slot);
		drop(state);

		let BackendPage { total, hits, continuation } = match result {
			Ok(page) => page,
			Err(err) => {
				tracing::warn!(%handle, error = %err, "Scroll continuation failed; cursor closed.");

				return Err(err.into());
			},
		};
		let cursor = continuation.map(|token| self.register(slot.origin.clone(), token, now));

		match cursor {
			Some(successor) => {
				tracing::debug!(%handle, %successor, tenant, "Advanced scroll cursor.");
			},
			None => {
				tracing::debug!(
					%handle,
					tenant,
					index = %slot.origin.index,
					age_secs = (now - slot.origin.created_at).whole_seconds(),
					"Scroll cursor exhausted."
				);
			},
		}

		Ok(ScrollPage { total, hits, cursor })
	}

	/// Explicit abandonment. Unknown handles are treated as already closed.
	pub async fn close(&self, tenant: &str, handle: CursorHandle) -> Result<()> {
		let Some(slot) = self.slot(handle) else {
			return Ok(());
		};

		if slot.origin.tenant != tenant {
			return Err(Error::Forbidden {
				message: "Scroll cursor belongs to another tenant.".to_string(),
			});
		}

		let mut state = slot.state.try_lock().map_err(|_| Error::CursorBusy {
			message: format!("Scroll cursor {handle} is already being advanced."),
		})?;
		let token = state.token.take();

		state.closed = true;
		self.forget(handle, &slot);
		drop(state);

		if let Some(token) = token {
			self.release_quietly(token).await;
		}

		tracing::debug!(%handle, tenant, "Closed scroll cursor.");

		Ok(())
	}

	/// Closes every cursor idle longer than the configured timeout and returns how many were
	/// reclaimed. Cursors with an advance in flight are left for a later pass.
	pub async fn reap_idle(&self, now: OffsetDateTime) -> usize {
		let slots: Vec<(CursorHandle, Arc<CursorSlot>)> =
			self.cursors.iter().map(|entry| (*entry.key(), entry.value().clone())).collect();
		let mut reaped = 0;

		for (handle, slot) in slots {
			let Ok(mut state) = slot.state.try_lock() else {
				continue;
			};

			if state.closed || !state.idle_past(now, self.idle_timeout) {
				continue;
			}

			let token = state.token.take();

			state.closed = true;
			self.forget(handle, &slot);
			drop(state);

			if let Some(token) = token {
				self.release_quietly(token).await;
			}

			reaped += 1;
		}

		reaped
	}

	fn slot(&self, handle: CursorHandle) -> Option<Arc<CursorSlot>> {
		self.cursors.get(&handle).map(|entry| entry.value().clone())
	}

	fn register(
		&self,
		origin: Arc<CursorOrigin>,
		token: ContinuationToken,
		now: OffsetDateTime,
	) -> CursorHandle {
		let handle = CursorHandle::generate();
		let slot = CursorSlot {
			origin,
			state: Mutex::new(CursorState { token: Some(token), last_used: now, closed: false }),
		};

		self.cursors.insert(handle, Arc::new(slot));

		handle
	}

	fn forget(&self, handle: CursorHandle, slot: &Arc<CursorSlot>) {
		self.cursors.remove_if(&handle, |_, current| Arc::ptr_eq(current, slot));
	}

	async fn release_quietly(&self, token: ContinuationToken) {
		if let Err(err) = self.backend.release(token).await {
			tracing::warn!(error = %err, "Failed to release scroll continuation.");
		}
	}
}

/// Closes a handle whose advance was dropped mid-continuation. The consumed token cannot be
/// released, so the backend holds that scroll context until its keep-alive lapses.
struct InFlightAdvance<'a> {
	manager: &'a ScrollCursorManager,
	handle: CursorHandle,
	slot: &'a Arc<CursorSlot>,
	settled: bool,
}
impl Drop for InFlightAdvance<'_> {
	fn drop(&mut self) {
		if self.settled {
			return;
		}

		self.manager.forget(self.handle, self.slot);

		tracing::warn!(
			handle = %self.handle,
			tenant = %self.slot.origin.tenant,
			"Scroll advance cancelled mid-continuation; backend context left to keep-alive."
		);
	}
}

/// Periodically reclaims idle cursors until the task is aborted.
pub fn spawn_reaper(manager: Arc<ScrollCursorManager>, every: StdDuration) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio_time::interval(every);

		ticker.set_missed_tick_behavior(tokio_time::MissedTickBehavior::Delay);

		loop {
			ticker.tick().await;

			let reaped = manager.reap_idle(OffsetDateTime::now_utc()).await;

			if reaped > 0 {
				tracing::info!(
					reaped,
					remaining = manager.open_cursors(),
					"Reaped idle scroll cursors."
				);
			}
		}
	})
}

fn expired(handle: CursorHandle) -> Error {
	Error::CursorExpired { message: format!("Scroll cursor {handle} is closed or unknown.") }
}
