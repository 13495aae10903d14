//! POSIX signal flags.
//!
//! Handlers only flip atomics; the scheduler polls them between frames.
//! These are the sole statics in the crate — signal handlers cannot reach
//! the [`crate::app::App`] context safely.

use std::sync::atomic::{AtomicBool, Ordering};

static QUIT: AtomicBool = AtomicBool::new(false);
static SLEEPY: AtomicBool = AtomicBool::new(false);
static AWAKE: AtomicBool = AtomicBool::new(false);

extern "C" fn on_quit(_sig: libc::c_int) {
    QUIT.store(true, Ordering::SeqCst);
}

extern "C" fn on_tstp(_sig: libc::c_int) {
    SLEEPY.store(true, Ordering::SeqCst);
}

extern "C" fn on_cont(_sig: libc::c_int) {
    AWAKE.store(true, Ordering::SeqCst);
}

/// Installs handlers for INT/TERM/QUIT (quit), TSTP (suspend) and CONT
/// (resume). SIGWINCH is left alone: crossterm reports it as a resize event
/// from the same poll loop that reads keys.
pub fn install() {
    unsafe {
        for sig in [libc::SIGINT, libc::SIGTERM, libc::SIGQUIT] {
            libc::signal(sig, on_quit as extern "C" fn(libc::c_int) as libc::sighandler_t);
        }
        libc::signal(
            libc::SIGTSTP,
            on_tstp as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGCONT,
            on_cont as extern "C" fn(libc::c_int) as libc::sighandler_t,
        );
    }
}

/// True once any of INT/TERM/QUIT has been delivered.
pub fn quit_requested() -> bool {
    QUIT.load(Ordering::SeqCst)
}

/// Consumes the suspend request set by SIGTSTP.
pub fn take_sleepy() -> bool {
    SLEEPY.swap(false, Ordering::SeqCst)
}

/// Consumes the resume notification set by SIGCONT.
pub fn take_awake() -> bool {
    AWAKE.swap(false, Ordering::SeqCst)
}
