//! Click, double-click, and hold detection on top of a debounced input
//! pin.

use super::input::InputPinController;
use crate::error::Result;
use crate::events::{lock, ButtonAction, ButtonEvent, ListenerId, ListenerRegistry};
use crate::pins::IsrPinIo;
use log::warn;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

struct ButtonState {
    // Bumped on every press and release; a pending hold timer fires only
    // if the generation it was armed with is still current.
    press_seq: u64,
    pressed: bool,
    hold_fired: bool,
    last_click: Option<Instant>,
}

struct ButtonShared {
    pin: u8,
    double_click: Duration,
    hold: Duration,
    state: Mutex<ButtonState>,
    cancel: Condvar,
    events: ListenerRegistry<ButtonEvent>,
}

impl ButtonShared {
    fn on_pin_changed(self: &Arc<Self>, pressed: bool) {
        if pressed {
            self.on_press();
        } else {
            self.on_release();
        }
    }

    fn on_press(self: &Arc<Self>) {
        let seq = {
            let mut state = lock(&self.state);
            state.press_seq += 1;
            state.pressed = true;
            state.press_seq
        };
        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("button{}-hold", self.pin))
            .spawn(move || shared.hold_timer(seq));
        if let Err(e) = spawned {
            warn!("failed to spawn hold timer for pin {}: {}", self.pin, e);
        }
    }

    // One-shot timer armed per press: emits a hold once `hold` has
    // elapsed with the pin still pressed, unless the release cancelled
    // this generation first.
    fn hold_timer(self: Arc<Self>, seq: u64) {
        let deadline = Instant::now() + self.hold;
        let mut state = lock(&self.state);
        loop {
            if state.press_seq != seq || !state.pressed {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                state.hold_fired = true;
                drop(state);
                self.events.emit(&ButtonEvent {
                    pin: self.pin,
                    action: ButtonAction::Hold,
                });
                return;
            }
            let (guard, _) = self
                .cancel
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }
    }

    fn on_release(self: &Arc<Self>) {
        let mut state = lock(&self.state);
        state.press_seq += 1;
        state.pressed = false;
        self.cancel.notify_all();
        let now = Instant::now();
        let hold_fired = state.hold_fired;
        state.hold_fired = false;
        let action = match state.last_click {
            Some(at) if now.duration_since(at) <= self.double_click => {
                state.last_click = None;
                ButtonAction::DoubleClick
            }
            _ => {
                state.last_click = Some(now);
                ButtonAction::Click
            }
        };
        drop(state);
        // A hold consumes the press entirely; neither click variant is
        // reported for it.
        if !hold_fired {
            self.events.emit(&ButtonEvent {
                pin: self.pin,
                action,
            });
        }
    }
}

/// Interprets press/release transitions of one input pin as clicks,
/// double-clicks, and holds.
///
/// A press held past `hold_ms` emits [`ButtonAction::Hold`] and swallows
/// the trailing click. A release within `double_click_ms` of the previous
/// click emits [`ButtonAction::DoubleClick`]; any other release emits a
/// plain [`ButtonAction::Click`] and becomes the reference point for the
/// next double-click window.
pub struct ButtonInputController {
    input: InputPinController,
    shared: Arc<ButtonShared>,
    subscription: ListenerId,
}

impl ButtonInputController {
    /// Binds to an input pin on an ISR-enabled device.
    pub fn new(
        device: Arc<dyn IsrPinIo>,
        pin: u8,
        gate_ms: u64,
        double_click_ms: u64,
        hold_ms: u64,
    ) -> Result<Self> {
        let input = InputPinController::new(device, pin, gate_ms)?;
        let shared = Arc::new(ButtonShared {
            pin,
            double_click: Duration::from_millis(double_click_ms),
            hold: Duration::from_millis(hold_ms),
            state: Mutex::new(ButtonState {
                press_seq: 0,
                pressed: false,
                hold_fired: false,
                last_click: None,
            }),
            cancel: Condvar::new(),
            events: ListenerRegistry::new(),
        });
        let subscription = {
            let shared = Arc::clone(&shared);
            input.watch_pin(Box::new(move |event| shared.on_pin_changed(event.state)))
        };
        Ok(Self {
            input,
            shared,
            subscription,
        })
    }

    /// The input pin this controller tracks.
    pub fn pin(&self) -> u8 {
        self.input.pin()
    }

    /// The last accepted (debounced) state of the pin.
    pub fn state(&self) -> bool {
        self.input.state()
    }

    /// The underlying debounced input controller.
    pub fn input(&self) -> &InputPinController {
        &self.input
    }

    /// Registers a callback fired on every detected button action.
    pub fn watch_button(&self, callback: Box<dyn Fn(&ButtonEvent) + Send>) -> ListenerId {
        self.shared.events.add(callback)
    }

    /// Removes a previously registered button callback.
    pub fn unwatch_button(&self, id: ListenerId) -> bool {
        self.shared.events.remove(id)
    }
}

impl Drop for ButtonInputController {
    fn drop(&mut self) {
        self.input.unwatch_pin(self.subscription);
        // Wake any pending hold timer so its thread exits promptly.
        let mut state = lock(&self.shared.state);
        state.press_seq += 1;
        state.pressed = false;
        drop(state);
        self.shared.cancel.notify_all();
    }
}
