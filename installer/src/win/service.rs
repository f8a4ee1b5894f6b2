//! Service control manager calls through the `windows-service` crate.

use std::{
    ffi::{OsStr, OsString},
    path::Path,
};
use windows_service::{
    service::{Service, ServiceAccess, ServiceErrorControl, ServiceInfo, ServiceStartType, ServiceType},
    service_manager::{ServiceManager, ServiceManagerAccess},
    Error,
};

use shared::constants::ERROR_GEN_FAILURE;
use crate::error::OsCode;

/// Win32 code behind a `windows-service` error.
fn os_code(err: Error) -> OsCode {
    match err {
        Error::Winapi(e) => e.raw_os_error().map_or(ERROR_GEN_FAILURE, |c| c as OsCode),
        _ => ERROR_GEN_FAILURE,
    }
}

fn manager(access: ServiceManagerAccess) -> Result<ServiceManager, OsCode> {
    ServiceManager::local_computer(None::<&str>, access).map_err(os_code)
}

fn open(name: &str, access: ServiceAccess) -> Result<Service, OsCode> {
    manager(ServiceManagerAccess::CONNECT)?
        .open_service(name, access)
        .map_err(os_code)
}

/// Demand-start kernel driver with normal error control.
pub fn create(name: &str, binary_path: &Path) -> Result<(), OsCode> {
    let info = ServiceInfo {
        name:             OsString::from(name),
        display_name:     OsString::from(name),
        service_type:     ServiceType::KERNEL_DRIVER,
        start_type:       ServiceStartType::OnDemand,
        error_control:    ServiceErrorControl::Normal,
        executable_path:  binary_path.to_path_buf(),
        launch_arguments: vec![],
        dependencies:     vec![],
        account_name:     None,
        account_password: None,
    };
    manager(ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE)?
        .create_service(&info, ServiceAccess::QUERY_STATUS)
        .map(drop)
        .map_err(os_code)
}

pub fn start(name: &str) -> Result<(), OsCode> {
    open(name, ServiceAccess::START)?
        .start::<&OsStr>(&[])
        .map_err(os_code)
}

pub fn stop(name: &str) -> Result<(), OsCode> {
    open(name, ServiceAccess::STOP)?.stop().map(drop).map_err(os_code)
}

pub fn delete(name: &str) -> Result<(), OsCode> {
    open(name, ServiceAccess::DELETE)?.delete().map_err(os_code)
}
