use parallax_ngin::{
    input::{Input, KeyState},
    timer::Timer,
};
use winit::{event::MouseButton, keyboard::KeyCode};

#[test]
fn hit_then_held_for_one_press() {
    let mut input = Input::new();
    input.key_down_event(KeyCode::Digit1);
    assert!(input.key_hit(KeyCode::Digit1));
    assert!(!input.key_hit(KeyCode::Digit1));
    assert!(input.key_held(KeyCode::Digit1));
    input.key_up_event(KeyCode::Digit1);
    assert!(!input.key_held(KeyCode::Digit1));
}

#[test]
fn held_check_consumes_pending_hit() {
    let mut input = Input::new();
    input.key_down_event(KeyCode::Escape);
    assert!(input.key_held(KeyCode::Escape));
    assert_eq!(input.state(KeyCode::Escape), KeyState::Held);
    assert!(!input.key_hit(KeyCode::Escape));
}

#[test]
fn mouse_buttons_are_keys_too() {
    let mut input = Input::new();
    assert_eq!(input.state(MouseButton::Left), KeyState::NotPressed);
    input.key_down_event(MouseButton::Left);
    assert_eq!(input.state(MouseButton::Left), KeyState::Pressed);
    input.key_down_event(MouseButton::Left);
    assert_eq!(input.state(MouseButton::Left), KeyState::Held);
    assert_eq!(input.state(MouseButton::Right), KeyState::NotPressed);
}

#[test]
fn stopped_timer_reports_no_lap() {
    let mut timer = Timer::new();
    timer.stop();
    let frozen = timer.time();
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert_eq!(timer.time(), frozen);
    timer.lap_time();
    assert_eq!(timer.lap_time(), 0.0);

    timer.start();
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert!(timer.lap_time() > 0.0);
}
