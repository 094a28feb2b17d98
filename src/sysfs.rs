// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Enumerate fc_host adapters from sysfs and open their bsg nodes.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Linux sysfs backed [`HbaLibrary`].

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;

use crate::error::Error;
use crate::hba::{AdapterAttr, HbaLibrary};
use crate::tables::PortSpeed;
use crate::transport::bsg::BsgPassThru;
use crate::types::{parse_number, PortId, Wwn};

/// Read and parse one attribute file below `dir`.
pub fn parse_value<T>(dir: &Path, file: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: ToString,
{
    let path = dir.join(file);
    let raw = fs::read_to_string(&path).map_err(|err| Error::Sysfs {
        path: path.clone(),
        detail: err.to_string(),
    })?;
    raw.trim().parse().map_err(|err: T::Err| Error::Sysfs {
        path,
        detail: err.to_string(),
    })
}

fn parse_hex_attr(dir: &Path, file: &str) -> Result<u64, Error> {
    let raw: String = parse_value(dir, file)?;
    parse_number(&raw).ok_or_else(|| Error::Sysfs {
        path: dir.join(file),
        detail: format!("'{raw}' is not a number"),
    })
}

/// Adapters found under `<sysfs_root>/class/fc_host`, opened via
/// `<dev_root>/bsg/fc_hostN`.
#[derive(Debug, Clone)]
pub struct SysfsHba {
    sysfs_root: PathBuf,
    dev_root: PathBuf,
    timeout_ms: u32,
}

impl SysfsHba {
    /// Create an enumerator over the given roots.
    pub fn new(sysfs_root: impl Into<PathBuf>, dev_root: impl Into<PathBuf>, timeout_ms: u32) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            dev_root: dev_root.into(),
            timeout_ms,
        }
    }

    fn class_dir(&self) -> PathBuf {
        self.sysfs_root.join("class").join("fc_host")
    }

    fn host_numbers(&self) -> Result<Vec<u32>, Error> {
        let class = self.class_dir();
        let entries = match fs::read_dir(&class) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist", class.display());
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        let mut hosts = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(host) = name
                .to_str()
                .and_then(|name| name.strip_prefix("host"))
                .and_then(|num| num.parse::<u32>().ok())
            {
                hosts.push(host);
            }
        }
        hosts.sort_unstable();
        Ok(hosts)
    }

    fn read_adapter(&self, host: u32) -> Result<AdapterAttr, Error> {
        let dir = self.class_dir().join(format!("host{host}"));
        let wwpn = Wwn::new(parse_hex_attr(&dir, "port_name")?);
        let d_id = PortId::new(parse_hex_attr(&dir, "port_id")? as u32);
        let speed = parse_value::<String>(&dir, "speed")
            .map(|text| PortSpeed::from_sysfs(&text))
            .unwrap_or_default();
        let online = parse_value::<String>(&dir, "port_state")
            .map(|state| state.eq_ignore_ascii_case("online"))
            .unwrap_or(false);
        let device = dir.join("device");
        let resolved = fs::canonicalize(&device).map_err(|err| Error::Sysfs {
            path: device.clone(),
            detail: err.to_string(),
        })?;
        let bus_name = resolved
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Sysfs {
                path: device,
                detail: "device link has no parent bus".to_owned(),
            })?;
        Ok(AdapterAttr {
            host,
            bus_name,
            wwpn,
            d_id,
            dev_name: self.dev_root.join("bsg").join(format!("fc_host{host}")),
            speed,
            online,
        })
    }
}

impl HbaLibrary for SysfsHba {
    type PassThru = BsgPassThru;

    fn adapters(&self) -> Result<Vec<AdapterAttr>, Error> {
        let mut adapters = Vec::new();
        for host in self.host_numbers()? {
            match self.read_adapter(host) {
                Ok(adapter) => adapters.push(adapter),
                Err(err) => debug!("skipping host{host}: {err}"),
            }
        }
        Ok(adapters)
    }

    fn open(&self, adapter: &AdapterAttr) -> Result<Self::PassThru, Error> {
        Ok(BsgPassThru::open(&adapter.dev_name, self.timeout_ms)?)
    }
}
