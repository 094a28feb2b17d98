// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Enumerate fc_host adapters from a throwaway sysfs tree and resolve selectors.
// Author: Lukas Bower
#![forbid(unsafe_code)]

use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;

use fcgs::error::Error;
use fcgs::hba::{open_adapter, AdapterSelector, HbaLibrary};
use fcgs::sysfs::SysfsHba;
use fcgs::tables::PortSpeed;
use fcgs::types::{PortId, Wwn};

fn write_host(root: &Path, host: u32, bus: &str, wwpn: &str, port_id: &str, state: &str) {
    let device = root
        .join("sys/devices/css0/0.0.0010")
        .join(bus)
        .join(format!("host{host}"));
    fs::create_dir_all(&device).expect("device dir");
    let dir = root.join(format!("sys/class/fc_host/host{host}"));
    fs::create_dir_all(&dir).expect("host dir");
    fs::write(dir.join("port_name"), format!("{wwpn}\n")).expect("port_name");
    fs::write(dir.join("port_id"), format!("{port_id}\n")).expect("port_id");
    fs::write(dir.join("speed"), "8 Gbit\n").expect("speed");
    fs::write(dir.join("port_state"), format!("{state}\n")).expect("port_state");
    symlink(&device, dir.join("device")).expect("device link");
}

fn fabric_tree() -> tempfile::TempDir {
    let root = tempfile::tempdir().expect("tempdir");
    write_host(root.path(), 10, "0.0.1901", "0xc05076ffe5005611", "0x651900", "Online");
    write_host(root.path(), 0, "0.0.5922", "0xc05076ffe5005610", "0x656d00", "Linkdown");
    write_host(root.path(), 2, "0.0.5923", "0xc05076ffe5005612", "0x656e00", "Online");
    // Broken entry without a port name.
    fs::create_dir_all(root.path().join("sys/class/fc_host/host7")).expect("broken host");
    fs::create_dir_all(root.path().join("dev/bsg")).expect("bsg dir");
    for host in [0, 2, 10] {
        fs::write(root.path().join(format!("dev/bsg/fc_host{host}")), b"").expect("node");
    }
    root
}

fn library(root: &Path) -> SysfsHba {
    SysfsHba::new(root.join("sys"), root.join("dev"), 9000)
}

#[test]
fn adapters_are_sorted_and_broken_hosts_skipped() {
    let root = fabric_tree();
    let adapters = library(root.path()).adapters().expect("adapters");
    let hosts: Vec<u32> = adapters.iter().map(|adapter| adapter.host).collect();
    assert_eq!(hosts, vec![0, 2, 10]);

    let first = &adapters[0];
    assert_eq!(first.bus_name, "0.0.5922");
    assert_eq!(first.wwpn, Wwn::new(0xc050_76ff_e500_5610));
    assert_eq!(first.d_id, PortId::new(0x656d00));
    assert_eq!(first.speed, PortSpeed::Gbit(8));
    assert!(!first.online);
    assert_eq!(first.dev_name, root.path().join("dev/bsg/fc_host0"));
}

#[test]
fn missing_class_directory_means_no_adapters() {
    let root = tempfile::tempdir().expect("tempdir");
    let adapters = library(root.path()).adapters().expect("adapters");
    assert!(adapters.is_empty());
    assert!(matches!(
        open_adapter(&library(root.path()), &AdapterSelector::Any),
        Err(Error::NoAdapter)
    ));
}

#[test]
fn default_selector_prefers_the_first_online_adapter() {
    let root = fabric_tree();
    let (adapter, _passthru) =
        open_adapter(&library(root.path()), &AdapterSelector::Any).expect("adapter");
    assert_eq!(adapter.host, 2);
}

#[test]
fn explicit_selectors_match_each_attribute() {
    let root = fabric_tree();
    let lib = library(root.path());
    for (text, host) in [
        ("0.0.1901", 10),
        ("fc_host0", 0),
        ("0x656e00", 2),
        ("0xc05076ffe5005610", 0),
    ] {
        let selector: AdapterSelector = text.parse().expect("selector");
        let (adapter, _passthru) = open_adapter(&lib, &selector).expect("adapter");
        assert_eq!(adapter.host, host, "selector {text}");
    }
    let selector: AdapterSelector = "0x123456".parse().expect("selector");
    assert!(matches!(open_adapter(&lib, &selector), Err(Error::NoAdapter)));
}

#[test]
fn missing_device_node_fails_to_open() {
    let root = fabric_tree();
    fs::remove_file(root.path().join("dev/bsg/fc_host2")).expect("remove node");
    assert!(matches!(
        open_adapter(&library(root.path()), &AdapterSelector::Any),
        Err(Error::Transport(_))
    ));
}
