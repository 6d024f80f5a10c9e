//! Sharing one punctured key between threads.
//!
//! Evaluations only need read access and may run in parallel; a
//! puncture takes the write lock, so every evaluation observes the
//! frontier either entirely before or entirely after it.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::info;
use zeroize::Zeroizing;

use crate::ggm::GGM;
use crate::key::Key;
use crate::path::Path;
use crate::{PPRFError, PPRF};

#[derive(Clone)]
pub struct SharedPprf {
    inner: Arc<RwLock<GGM>>,
}

impl SharedPprf {
    pub fn new(pprf: GGM) -> Self {
        Self {
            inner: Arc::new(RwLock::new(pprf)),
        }
    }

    pub fn eval(&self, path: &Path) -> Result<Key, PPRFError> {
        self.read()?.eval(path)
    }

    pub fn puncture(&self, path: &Path) -> Result<(), PPRFError> {
        let mut pprf = self.write()?;
        pprf.puncture(path)?;
        info!("Punctured leaf, {} punctures so far", pprf.num_punctures());
        Ok(())
    }

    /// A consistent copy of the current punctured key.
    pub fn snapshot(&self) -> Result<GGM, PPRFError> {
        Ok(self.read()?.clone())
    }

    pub fn encode(&self) -> Result<Zeroizing<Vec<u8>>, PPRFError> {
        self.read()?.to_bytes()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, GGM>, PPRFError> {
        self.inner.read().map_err(|_| PPRFError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GGM>, PPRFError> {
        self.inner.write().map_err(|_| PPRFError::LockPoisoned)
    }
}

impl From<GGM> for SharedPprf {
    fn from(pprf: GGM) -> Self {
        SharedPprf::new(pprf)
    }
}
