//! Exercise the plugin entry point the way a host runtime does.
//!
//! Usage: cargo run --example host_session
//! Needs a running OSVR server and the ClientKit library to get past Init.

use driver_osvr::ffi::{HmdDriverFactory, ProviderShim, IHMD_DRIVER_PROVIDER_VERSION};
use driver_osvr::HmdError;
use std::ffi::{c_int, CString};
use std::time::Duration;

fn main() {
    for name in ["NotAPrefix_001", "IHmdDriverProvider_Unknown"] {
        let c_name = CString::new(name).unwrap();
        let mut code: c_int = 0;
        let ptr = unsafe { HmdDriverFactory(c_name.as_ptr(), &mut code) };
        println!("{:<28} -> ptr={:?} code={}", name, ptr, code);
    }

    let c_name = CString::new(IHMD_DRIVER_PROVIDER_VERSION).unwrap();
    let mut code: c_int = 0;
    let ptr = unsafe { HmdDriverFactory(c_name.as_ptr(), &mut code) } as *mut ProviderShim;
    if ptr.is_null() {
        eprintln!("Factory refused {}: {}", IHMD_DRIVER_PROVIDER_VERSION, code);
        std::process::exit(1);
    }

    let shim = unsafe { &*ptr };
    let vtable = shim.vtable();
    let empty = CString::new("").unwrap();

    let rc = unsafe { (vtable.init)(ptr, empty.as_ptr(), empty.as_ptr()) };
    if rc != HmdError::None.code() {
        eprintln!("Init failed with code {}", rc);
        std::process::exit(1);
    }

    println!("HMDs: {}", unsafe { (vtable.get_hmd_count)(ptr) });

    let poses = shim.provider().poses();
    let mut count = 0;
    while count < 10 {
        match poses.recv_timeout(Duration::from_secs(2)) {
            Ok(sample) => {
                count += 1;
                println!(
                    "t={}.{:06}  pos=[{:+.4}, {:+.4}, {:+.4}]",
                    sample.timestamp.seconds,
                    sample.timestamp.microseconds,
                    sample.translation[0],
                    sample.translation[1],
                    sample.translation[2],
                );
            }
            Err(_) => {
                eprintln!("Timeout waiting for poses");
                break;
            }
        }
    }

    unsafe { (vtable.cleanup)(ptr) };
}
