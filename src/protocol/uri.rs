// src/protocol/uri.rs

//! Fixed URIs that are part of the wire contract with any compliant router.

// --- Registration meta procedures ---
pub const REGISTRATION_LIST: &str = "wamp.registration.list";
pub const REGISTRATION_LOOKUP: &str = "wamp.registration.lookup";
pub const REGISTRATION_GET: &str = "wamp.registration.get";

// --- Registration meta events ---
pub const REGISTRATION_ON_CREATE: &str = "wamp.registration.on_create";
pub const REGISTRATION_ON_REGISTER: &str = "wamp.registration.on_register";
pub const REGISTRATION_ON_UNREGISTER: &str = "wamp.registration.on_unregister";

// --- Close reasons ---
pub const CLOSE_SYSTEM_SHUTDOWN: &str = "wamp.close.system_shutdown";
pub const CLOSE_CLOSE_REALM: &str = "wamp.close.close_realm";
pub const CLOSE_GOODBYE_AND_OUT: &str = "wamp.close.goodbye_and_out";

// --- Errors ---
pub const ERROR_NO_SUCH_REGISTRATION: &str = "wamp.error.no_such_registration";
pub const ERROR_NO_SUCH_PROCEDURE: &str = "wamp.error.no_such_procedure";
pub const ERROR_NO_SUCH_SUBSCRIPTION: &str = "wamp.error.no_such_subscription";
pub const ERROR_PROCEDURE_ALREADY_EXISTS: &str = "wamp.error.procedure_already_exists";
pub const ERROR_RUNTIME_ERROR: &str = "wamp.error.runtime_error";
pub const ERROR_INVALID_ARGUMENT: &str = "wamp.error.invalid_argument";
pub const ERROR_NO_SUCH_REALM: &str = "wamp.error.no_such_realm";
