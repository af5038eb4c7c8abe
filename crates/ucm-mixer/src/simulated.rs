//! In-memory mixer transport.
//!
//! Clones share one control table, so a test can hand one handle to the
//! router and keep another to inspect writes and inject faults.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{MixerError, MixerResult};
use crate::transport::{ControlInfo, ControlKind, ControlState, MixerTransport};

/// One successful write, as seen by the simulated hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub control: String,
    pub state: ControlState,
}

#[derive(Debug, Clone)]
struct SimControl {
    info: ControlInfo,
    state: ControlState,
    /// Created on first use by a permissive mixer; accepts any values.
    auto: bool,
}

#[derive(Debug, Clone)]
enum Fault {
    /// Fail the write when the countdown reaches 1.
    NthWrite(usize),
    Control(String),
}

#[derive(Debug, Default)]
struct Inner {
    controls: BTreeMap<String, SimControl>,
    log: Vec<WriteRecord>,
    faults: Vec<Fault>,
    permissive: bool,
    closed: bool,
}

impl Inner {
    fn check_faults(&mut self, name: &str) -> MixerResult<()> {
        let mut tripped = false;
        self.faults.retain_mut(|fault| match fault {
            Fault::NthWrite(1) => {
                tripped = true;
                false
            }
            Fault::NthWrite(n) => {
                *n -= 1;
                true
            }
            Fault::Control(control) => {
                if control == name {
                    tripped = true;
                }
                true
            }
        });
        if tripped {
            return Err(MixerError::Transport {
                control: name.to_string(),
                detail: "injected fault".into(),
            });
        }
        Ok(())
    }

    fn control_mut(&mut self, name: &str) -> MixerResult<&mut SimControl> {
        if self.permissive && !self.controls.contains_key(name) {
            self.controls.insert(name.to_string(), permissive_control());
        }
        self.controls
            .get_mut(name)
            .ok_or_else(|| MixerError::NoSuchControl(name.to_string()))
    }
}

fn permissive_control() -> SimControl {
    SimControl {
        info: ControlInfo {
            kind: ControlKind::Integer { min: 0, max: 100 },
            count: 1,
        },
        state: ControlState::Values(vec![0]),
        auto: true,
    }
}

/// Shared-handle simulated mixer.
#[derive(Debug, Clone, Default)]
pub struct SimulatedMixer {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedMixer {
    /// Strict mixer: only declared controls exist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mixer that accepts any control name and any option label.
    ///
    /// Undeclared controls report a single 0..=100 integer slot, grow to
    /// fit whatever is written and turn enumerated once a string is
    /// selected on them.
    pub fn permissive() -> Self {
        let mixer = Self::default();
        mixer.inner.lock().permissive = true;
        mixer
    }

    fn add(&self, name: &str, info: ControlInfo, state: ControlState) {
        self.inner
            .lock()
            .controls
            .insert(
                name.to_string(),
                SimControl {
                    info,
                    state,
                    auto: false,
                },
            );
    }

    pub fn add_boolean(&self, name: &str) {
        self.add(
            name,
            ControlInfo {
                kind: ControlKind::Boolean,
                count: 1,
            },
            ControlState::Values(vec![0]),
        );
    }

    pub fn add_integer(&self, name: &str, min: i64, max: i64, count: usize) {
        self.add(
            name,
            ControlInfo {
                kind: ControlKind::Integer { min, max },
                count,
            },
            ControlState::Values(vec![min; count]),
        );
    }

    pub fn add_enumerated(&self, name: &str, options: &[&str]) {
        let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
        let initial = options.first().cloned().unwrap_or_default();
        self.add(
            name,
            ControlInfo {
                kind: ControlKind::Enumerated { options },
                count: 1,
            },
            ControlState::Option(initial),
        );
    }

    /// Fail the `n`th write from now (1-based). Reads never count.
    pub fn fail_nth_write(&self, n: usize) {
        if n > 0 {
            self.inner.lock().faults.push(Fault::NthWrite(n));
        }
    }

    /// Fail every write to `name` until faults are cleared.
    pub fn fail_control(&self, name: &str) {
        self.inner.lock().faults.push(Fault::Control(name.to_string()));
    }

    pub fn clear_faults(&self) {
        self.inner.lock().faults.clear();
    }

    pub fn state(&self, name: &str) -> Option<ControlState> {
        self.inner.lock().controls.get(name).map(|c| c.state.clone())
    }

    /// Current value of every known control.
    pub fn snapshot(&self) -> BTreeMap<String, ControlState> {
        self.inner
            .lock()
            .controls
            .iter()
            .map(|(name, c)| (name.clone(), c.state.clone()))
            .collect()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.inner.lock().log.clone()
    }

    pub fn write_count(&self) -> usize {
        self.inner.lock().log.len()
    }

    pub fn clear_log(&self) {
        self.inner.lock().log.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl MixerTransport for SimulatedMixer {
    fn control_info(&self, name: &str) -> MixerResult<ControlInfo> {
        let inner = self.inner.lock();
        match inner.controls.get(name) {
            Some(control) => Ok(control.info.clone()),
            None if inner.permissive => Ok(permissive_control().info),
            None => Err(MixerError::NoSuchControl(name.to_string())),
        }
    }

    fn read(&self, name: &str) -> MixerResult<ControlState> {
        let inner = self.inner.lock();
        match inner.controls.get(name) {
            Some(control) => Ok(control.state.clone()),
            None if inner.permissive => Ok(permissive_control().state),
            None => Err(MixerError::NoSuchControl(name.to_string())),
        }
    }

    fn write_values(&mut self, name: &str, values: &[i64]) -> MixerResult<()> {
        let mut inner = self.inner.lock();
        inner.check_faults(name)?;
        let control = inner.control_mut(name)?;

        if control.auto {
            control.info.count = control.info.count.max(values.len());
        } else {
            if values.len() > control.info.count {
                return Err(MixerError::InvalidValue {
                    control: name.to_string(),
                    detail: format!("{} values for {} slots", values.len(), control.info.count),
                });
            }
            let in_range = |v: &i64| match &control.info.kind {
                ControlKind::Boolean => *v == 0 || *v == 1,
                ControlKind::Integer { min, max } => (*min..=*max).contains(v),
                ControlKind::Enumerated { .. } => false,
            };
            if let Some(bad) = values.iter().find(|v| !in_range(v)) {
                return Err(MixerError::InvalidValue {
                    control: name.to_string(),
                    detail: format!("value {} not accepted", bad),
                });
            }
        }

        let mut current = match &control.state {
            ControlState::Values(v) => v.clone(),
            ControlState::Option(_) => vec![0; control.info.count],
        };
        current.resize(control.info.count, 0);
        current[..values.len()].copy_from_slice(values);
        control.state = ControlState::Values(current);

        let record = WriteRecord {
            control: name.to_string(),
            state: control.state.clone(),
        };
        inner.log.push(record);
        Ok(())
    }

    fn select(&mut self, name: &str, option: &str) -> MixerResult<()> {
        let mut inner = self.inner.lock();
        inner.check_faults(name)?;
        let permissive = inner.permissive;
        let control = inner.control_mut(name)?;

        if let ControlKind::Enumerated { options } = &mut control.info.kind {
            if !options.iter().any(|o| o == option) {
                if !permissive {
                    return Err(MixerError::InvalidValue {
                        control: name.to_string(),
                        detail: format!("unknown option '{}'", option),
                    });
                }
                options.push(option.to_string());
            }
        } else if permissive {
            control.info = ControlInfo {
                kind: ControlKind::Enumerated {
                    options: vec![option.to_string()],
                },
                count: 1,
            };
        } else {
            return Err(MixerError::InvalidValue {
                control: name.to_string(),
                detail: "not an enumerated control".into(),
            });
        }
        control.state = ControlState::Option(option.to_string());

        let record = WriteRecord {
            control: name.to_string(),
            state: control.state.clone(),
        };
        inner.log.push(record);
        Ok(())
    }

    fn close(&mut self) {
        self.inner.lock().closed = true;
    }
}
