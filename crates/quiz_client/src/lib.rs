//! Client for the live quiz service: schedule polling and the broadcast socket.

pub mod auth;
pub mod rest;
pub mod scheduler;
pub mod ws;

pub use auth::QuizAuth;
pub use rest::QuizRestClient;
pub use scheduler::{
    Backoff, Clock, ScheduleSource, SchedulerPolicy, ShowScheduler, Sleeper, SystemClock,
    TokioSleeper,
};
pub use ws::{decode_frame, RoundHandler, SessionConnection, SessionEnd};
