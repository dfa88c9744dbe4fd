//! Tests for the event-driven input controllers, fed by a scripted
//! interrupt source instead of real hardware.

use piface_spi::controllers::{
    ButtonInputController, InputPinController, InputPinGroupController, PinGroupMode,
};
use piface_spi::{
    ButtonAction, ButtonEvent, Error, InputsChanged, IsrPinIo, ListenerId, ListenerRegistry,
    PiFaceEmulator, PinChanged, PinIo,
};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A device double that reports as ISR-enabled and lets tests inject
/// interrupt events directly.
struct ScriptedIsrDevice {
    inner: PiFaceEmulator,
    isr_enabled: bool,
    inputs_changed: ListenerRegistry<InputsChanged>,
}

impl ScriptedIsrDevice {
    fn new() -> Self {
        Self {
            inner: PiFaceEmulator::new(),
            isr_enabled: true,
            inputs_changed: ListenerRegistry::new(),
        }
    }

    fn without_isr() -> Self {
        Self {
            isr_enabled: false,
            ..Self::new()
        }
    }

    fn fire(&self, latch: u8, states: u8) {
        self.inputs_changed.emit(&InputsChanged { latch, states });
    }
}

impl PinIo for ScriptedIsrDevice {
    fn get_output(&self, pin: u8) -> piface_spi::Result<bool> {
        self.inner.get_output(pin)
    }
    fn get_outputs(&self) -> piface_spi::Result<u8> {
        self.inner.get_outputs()
    }
    fn set_output(&self, pin: u8, enabled: bool) -> piface_spi::Result<()> {
        self.inner.set_output(pin, enabled)
    }
    fn set_outputs(&self, bits: u8) -> piface_spi::Result<()> {
        self.inner.set_outputs(bits)
    }
    fn get_input(&self, pin: u8) -> piface_spi::Result<bool> {
        self.inner.get_input(pin)
    }
    fn get_inputs(&self) -> piface_spi::Result<u8> {
        self.inner.get_inputs()
    }
    fn set_input(&self, pin: u8, enabled: bool) -> piface_spi::Result<()> {
        self.inner.set_input(pin, enabled)
    }
    fn set_inputs(&self, bits: u8) -> piface_spi::Result<()> {
        self.inner.set_inputs(bits)
    }
}

impl IsrPinIo for ScriptedIsrDevice {
    fn is_isr_enabled(&self) -> bool {
        self.isr_enabled
    }
    fn watch_inputs(&self, callback: Box<dyn Fn(&InputsChanged) + Send>) -> ListenerId {
        self.inputs_changed.add(callback)
    }
    fn unwatch_inputs(&self, id: ListenerId) -> bool {
        self.inputs_changed.remove(id)
    }
}

fn watch_pin_changes(controller: &InputPinController) -> mpsc::Receiver<PinChanged> {
    let (tx, rx) = mpsc::channel();
    controller.watch_pin(Box::new(move |event| {
        let _ = tx.send(*event);
    }));
    rx
}

fn watch_buttons(controller: &ButtonInputController) -> mpsc::Receiver<ButtonEvent> {
    let (tx, rx) = mpsc::channel();
    controller.watch_button(Box::new(move |event| {
        let _ = tx.send(*event);
    }));
    rx
}

const RECV_WAIT: Duration = Duration::from_millis(500);

#[test]
fn input_controller_requires_isr_device() {
    let device = Arc::new(ScriptedIsrDevice::without_isr());
    assert!(matches!(
        InputPinController::new(device, 0, 20),
        Err(Error::ArgumentOutOfRange(_))
    ));
}

#[test]
fn input_controller_tracks_latched_changes() {
    let device = Arc::new(ScriptedIsrDevice::new());
    let controller = InputPinController::new(device.clone(), 2, 0).unwrap();
    let rx = watch_pin_changes(&controller);

    device.fire(0b100, 0b100);
    let event = rx.recv_timeout(RECV_WAIT).unwrap();
    assert_eq!(event.pin, 2);
    assert!(event.state);
    assert!(controller.state());

    device.fire(0b100, 0b000);
    let event = rx.recv_timeout(RECV_WAIT).unwrap();
    assert!(!event.state);
    assert!(!controller.state());
}

#[test]
fn input_controller_ignores_other_pins() {
    let device = Arc::new(ScriptedIsrDevice::new());
    let controller = InputPinController::new(device.clone(), 0, 0).unwrap();
    let rx = watch_pin_changes(&controller);

    // Neither latched for pin 0 nor a level change on it.
    device.fire(0b1000, 0b1000);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert!(!controller.state());
}

#[test]
fn input_controller_accepts_unlatched_level_change() {
    let device = Arc::new(ScriptedIsrDevice::new());
    let controller = InputPinController::new(device.clone(), 1, 0).unwrap();
    let rx = watch_pin_changes(&controller);

    // Pin 1 did not raise the interrupt, but its level moved.
    device.fire(0b0001, 0b0010);
    let event = rx.recv_timeout(RECV_WAIT).unwrap();
    assert!(event.state);
}

#[test]
fn gate_interval_suppresses_bounce() {
    let device = Arc::new(ScriptedIsrDevice::new());
    let controller = InputPinController::new(device.clone(), 0, 200).unwrap();
    let rx = watch_pin_changes(&controller);

    device.fire(1, 1);
    assert!(rx.recv_timeout(RECV_WAIT).unwrap().state);

    // Bounce inside the gate window is dropped without updating state.
    device.fire(1, 0);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert!(controller.state());

    thread::sleep(Duration::from_millis(250));
    device.fire(1, 0);
    assert!(!rx.recv_timeout(RECV_WAIT).unwrap().state);
}

#[test]
fn button_single_click() {
    let device = Arc::new(ScriptedIsrDevice::new());
    let button = ButtonInputController::new(device.clone(), 0, 0, 200, 1000).unwrap();
    let rx = watch_buttons(&button);

    device.fire(1, 1);
    device.fire(1, 0);
    let event = rx.recv_timeout(RECV_WAIT).unwrap();
    assert_eq!(event.action, ButtonAction::Click);
    assert_eq!(event.pin, 0);
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn button_double_click() {
    let device = Arc::new(ScriptedIsrDevice::new());
    let button = ButtonInputController::new(device.clone(), 0, 0, 400, 1000).unwrap();
    let rx = watch_buttons(&button);

    device.fire(1, 1);
    device.fire(1, 0);
    assert_eq!(
        rx.recv_timeout(RECV_WAIT).unwrap().action,
        ButtonAction::Click
    );

    thread::sleep(Duration::from_millis(50));
    device.fire(1, 1);
    device.fire(1, 0);
    assert_eq!(
        rx.recv_timeout(RECV_WAIT).unwrap().action,
        ButtonAction::DoubleClick
    );

    // The double-click consumed the remembered click; a third pair after
    // the window starts over with a plain click.
    thread::sleep(Duration::from_millis(450));
    device.fire(1, 1);
    device.fire(1, 0);
    assert_eq!(
        rx.recv_timeout(RECV_WAIT).unwrap().action,
        ButtonAction::Click
    );
}

#[test]
fn button_hold_suppresses_click() {
    let device = Arc::new(ScriptedIsrDevice::new());
    let button = ButtonInputController::new(device.clone(), 3, 0, 200, 80).unwrap();
    let rx = watch_buttons(&button);

    device.fire(0b1000, 0b1000);
    let event = rx.recv_timeout(RECV_WAIT).unwrap();
    assert_eq!(event.action, ButtonAction::Hold);
    assert_eq!(event.pin, 3);

    device.fire(0b1000, 0);
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn button_released_before_hold_does_not_hold() {
    let device = Arc::new(ScriptedIsrDevice::new());
    let button = ButtonInputController::new(device.clone(), 0, 0, 100, 300).unwrap();
    let rx = watch_buttons(&button);

    device.fire(1, 1);
    device.fire(1, 0);
    assert_eq!(
        rx.recv_timeout(RECV_WAIT).unwrap().action,
        ButtonAction::Click
    );
    // Past the hold window: the cancelled timer must stay silent.
    thread::sleep(Duration::from_millis(400));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn group_controller_any_mode() {
    let device = Arc::new(ScriptedIsrDevice::new());
    let group =
        InputPinGroupController::new(device.clone(), 0b0011, PinGroupMode::Any, 0).unwrap();
    let (tx, rx) = mpsc::channel();
    group.watch_group(Box::new(move |event| {
        let _ = tx.send(*event);
    }));
    assert!(!group.state());

    device.fire(0b0001, 0b0001);
    let event = rx.recv_timeout(RECV_WAIT).unwrap();
    assert!(event.state);
    assert_eq!(event.latch, 0b0001);
    assert_eq!(event.mask, 0b0011);

    // Still one group member set: no transition, no event.
    device.fire(0b0010, 0b0011);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    device.fire(0b0011, 0b0000);
    assert!(!rx.recv_timeout(RECV_WAIT).unwrap().state);
}

#[test]
fn group_controller_all_mode() {
    let device = Arc::new(ScriptedIsrDevice::new());
    let group =
        InputPinGroupController::new(device.clone(), 0b0011, PinGroupMode::All, 0).unwrap();
    let (tx, rx) = mpsc::channel();
    group.watch_group(Box::new(move |event| {
        let _ = tx.send(*event);
    }));

    device.fire(0b0001, 0b0001);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    device.fire(0b0010, 0b0011);
    let event = rx.recv_timeout(RECV_WAIT).unwrap();
    assert!(event.state);
    assert_eq!(event.latch, 0b0010);
}

#[test]
fn group_controller_seeds_state_from_device() {
    let device = Arc::new(ScriptedIsrDevice::new());
    device.set_inputs(0b0011).unwrap();
    let group =
        InputPinGroupController::new(device.clone(), 0b0011, PinGroupMode::All, 0).unwrap();
    assert!(group.state());
}

#[test]
fn dropped_controller_unsubscribes() {
    let device = Arc::new(ScriptedIsrDevice::new());
    let controller = InputPinController::new(device.clone(), 0, 0).unwrap();
    let rx = watch_pin_changes(&controller);
    drop(controller);
    device.fire(1, 1);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}
