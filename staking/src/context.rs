//! Execution context: the store, the current block header and the events
//! emitted so far.
//!
//! Every message runs inside a [`Context::branch`]: a copy-on-write overlay
//! whose writes and events reach the parent only if the closure returns
//! `Ok`. [`Context::simulate`] runs a closure on an overlay that is always
//! discarded, optionally under a different block header.

use lsm_store::{CacheStore, KvStore, StoreError};
use lsm_types::Timestamp;

use crate::events::StakingEvent;

/// Height and time of the block being processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub height: u64,
    pub time: Timestamp,
}

impl BlockHeader {
    pub fn new(height: u64, time: Timestamp) -> Self {
        Self { height, time }
    }
}

pub struct Context<'a> {
    store: &'a mut dyn KvStore,
    header: BlockHeader,
    events: Vec<StakingEvent>,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn KvStore, header: BlockHeader) -> Self {
        Self {
            store,
            header,
            events: Vec::new(),
        }
    }

    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    pub fn header(&self) -> BlockHeader {
        self.header
    }

    pub fn block_height(&self) -> u64 {
        self.header.height
    }

    pub fn block_time(&self) -> Timestamp {
        self.header.time
    }

    pub fn emit(&mut self, event: StakingEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[StakingEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<StakingEvent> {
        std::mem::take(&mut self.events)
    }

    /// Run `f` on a cache branch. Writes and events are committed to this
    /// context only when `f` succeeds.
    pub fn branch<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Context<'_>) -> Result<T, E>,
    {
        let header = self.header;
        let mut cache = CacheStore::new(&*self.store);
        let (result, events) = {
            let mut sub = Context::new(&mut cache, header);
            let result = f(&mut sub);
            (result, sub.events)
        };
        let writes = cache.into_writes();
        let value = result?;
        self.store.apply(writes)?;
        self.events.extend(events);
        Ok(value)
    }

    /// Run `f` on a throwaway branch under `header`. Nothing is committed.
    pub fn simulate<T, F>(&self, header: BlockHeader, f: F) -> T
    where
        F: FnOnce(&mut Context<'_>) -> T,
    {
        let mut cache = CacheStore::new(&*self.store);
        let mut sub = Context::new(&mut cache, header);
        f(&mut sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsm_nullables::NullKvStore;

    #[test]
    fn test_branch_commits_on_success() {
        let mut store = NullKvStore::new();
        let mut ctx = Context::new(&mut store, BlockHeader::default());
        let out: Result<u8, StoreError> = ctx.branch(|c| {
            c.store_mut().set(b"k", vec![1])?;
            c.emit(StakingEvent::UnbondValidator {
                validator: Default::default(),
            });
            Ok(7)
        });
        assert_eq!(out, Ok(7));
        assert_eq!(ctx.events().len(), 1);
        assert_eq!(ctx.store().get(b"k").unwrap(), Some(vec![1]));
    }

    #[test]
    fn test_branch_discards_on_error() {
        let mut store = NullKvStore::new();
        let mut ctx = Context::new(&mut store, BlockHeader::default());
        let out: Result<(), StoreError> = ctx.branch(|c| {
            c.store_mut().set(b"k", vec![1])?;
            c.emit(StakingEvent::UnbondValidator {
                validator: Default::default(),
            });
            Err(StoreError::Backend("boom".into()))
        });
        assert!(out.is_err());
        assert!(ctx.events().is_empty());
        assert_eq!(ctx.store().get(b"k").unwrap(), None);
    }

    #[test]
    fn test_simulate_never_commits() {
        let mut store = NullKvStore::new();
        let ctx = Context::new(&mut store, BlockHeader::new(5, Timestamp::new(50)));
        let seen = ctx.simulate(BlockHeader::new(10, Timestamp::new(80)), |c| {
            c.store_mut().set(b"k", vec![1]).unwrap();
            c.block_height()
        });
        assert_eq!(seen, 10);
        assert_eq!(ctx.store().get(b"k").unwrap(), None);
    }
}
