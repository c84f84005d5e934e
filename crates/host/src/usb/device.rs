//! Teensy device handle
//!
//! Finds the board by vendor/product id, detaches any kernel driver bound to
//! the configured interface and claims it. Dropping the device releases the
//! interface and gives it back to the kernel.

use crate::config::UsbSettings;
use crate::error::TransportError;
use rusb::{Context, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Opened and claimed Teensy
pub struct TeensyDevice {
    handle: DeviceHandle<Context>,
    interface: u8,
    detached_kernel_driver: bool,
}

impl TeensyDevice {
    /// Open the first device matching the configured ids
    pub fn open(settings: &UsbSettings) -> Result<Self, TransportError> {
        let context = Context::new()?;
        let not_found = TransportError::DeviceNotFound {
            vendor_id: settings.vendor_id,
            product_id: settings.product_id,
        };

        let device = context
            .devices()?
            .iter()
            .find(|device| {
                device.device_descriptor().is_ok_and(|d| {
                    d.vendor_id() == settings.vendor_id && d.product_id() == settings.product_id
                })
            })
            .ok_or(not_found)?;

        let handle = device.open().map_err(|e| {
            warn!("Failed to open device: {}", e);
            match e {
                rusb::Error::Access => TransportError::Access,
                rusb::Error::NoDevice | rusb::Error::NotFound => TransportError::DeviceNotFound {
                    vendor_id: settings.vendor_id,
                    product_id: settings.product_id,
                },
                other => TransportError::Usb(other),
            }
        })?;

        debug!(
            "Opened {:04x}:{:04x} on bus {:03} device {:03}",
            settings.vendor_id,
            settings.product_id,
            device.bus_number(),
            device.address()
        );

        let interface = settings.interface;
        let detached_kernel_driver = match handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!("Detaching kernel driver from interface {}", interface);
                handle.detach_kernel_driver(interface)?;
                true
            }
            Ok(false) => false,
            Err(e) => {
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    interface, e
                );
                false
            }
        };

        if let Err(e) = handle.claim_interface(interface) {
            warn!("Failed to claim interface {}: {}", interface, e);
            if detached_kernel_driver {
                let _ = handle.attach_kernel_driver(interface);
            }
            return Err(match e {
                rusb::Error::Busy | rusb::Error::Access => TransportError::Access,
                other => TransportError::Usb(other),
            });
        }

        info!(
            "Claimed interface {} on {:04x}:{:04x}",
            interface, settings.vendor_id, settings.product_id
        );

        Ok(Self {
            handle,
            interface,
            detached_kernel_driver,
        })
    }

    pub fn write_interrupt(
        &self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.handle.write_interrupt(endpoint, data, timeout)
    }

    pub fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.handle.read_interrupt(endpoint, buf, timeout)
    }
}

impl Drop for TeensyDevice {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(self.interface) {
            debug!("Failed to release interface {}: {}", self.interface, e);
        }
        if self.detached_kernel_driver {
            if let Err(e) = self.handle.attach_kernel_driver(self.interface) {
                debug!(
                    "Could not reattach kernel driver to interface {}: {}",
                    self.interface, e
                );
            }
        }
        debug!("Closed device");
    }
}
