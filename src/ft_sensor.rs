/// Force/torque sensor facade over one board of an `EthInterfaceManager`
///
/// Configuration calls are synchronous TCP transactions: encode the request
/// into the scratch buffer, send, receive the reply into the same buffer,
/// decode it and check its id. A reply with an unexpected id fails with
/// `ProtocolMismatch` and its fields are discarded. Some commands have no
/// reply and only send.
///
/// Streaming samples arrive on the manager's receive thread and are kept
/// behind a mutex; `get_ft_data`/`get_raw_ft_data` copy the latest one.
///
/// One facade is not meant to run transactions from several threads at once:
/// they share the scratch buffer, hence `&mut self`.
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::board::HandlerId;
use crate::codec::WireMessage;
use crate::config::SensorConfig;
use crate::errors::{MultitorqueError, Result};
use crate::eth_manager::{BoardId, EthInterfaceManager};
use crate::messages::{
    BCastSensorData, BoardReturnCode, CalibrateOffsets, ClearFault, GetBoardInfo,
    GetCalibrationMatrixRow, GetCalibrationOffsets, GetCalibrationTemp, GetFault, GetGateway,
    GetIpAddress, GetMacAddress, GetNetmask, GetSampleStreamPolicy, LoadInventoryDataFromFlash,
    MacAddressReturnCode, MessageId, ReplyBoardInfo, ReplyClearFault, ReplyFault,
    ReplyGetCalibrationMatrixRow, ReplyGetCalibrationOffsets, ReplyGetCalibrationTemp,
    ReplyGetGateway, ReplyGetIpAddress, ReplyGetMacAddress, ReplyGetNetmask,
    ReplyGetSampleStreamPolicy, ReplyLoadInventoryDataFromFlash, ReplySetMacAddress,
    ReplySetTempFactors, SampleStreamPolicy, SaveInventoryDataOnFlash, SaveParamsOnFlash,
    SetCalibrationMatrixRow, SetGateway, SetIpAddress, SetMacAddress, SetNetmask,
    SetSampleStreamPolicy, SetTempFactors,
};
use crate::packet::PacketBuffer;

pub const FT_SENSOR_AXIS: usize = 6;

/// Fx, Fy, Fz, Tx, Ty, Tz
pub type FtSensorData = [f32; FT_SENSOR_AXIS];

pub type FtCalibrationOffsets = [u32; FT_SENSOR_AXIS];

/// Octets 6 and 7 are padding on the board side
pub type MacAddress = [u8; 8];

/// Raw-unit bound on each axis after offset calibration
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationLimits {
    pub max_force_xy: f32,
    pub max_force_z: f32,
    pub max_torque_xy: f32,
    pub max_torque_z: f32,
}

impl Default for CalibrationLimits {
    fn default() -> Self {
        Self {
            max_force_xy: 50000.0,
            max_force_z: 30000.0,
            max_torque_xy: 3500.0,
            max_torque_z: 4500.0,
        }
    }
}

impl CalibrationLimits {
    /// True when every axis of `sample` is within its bound
    pub fn accepts(&self, sample: &FtSensorData) -> bool {
        let bounds = [
            self.max_force_xy,
            self.max_force_xy,
            self.max_force_z,
            self.max_torque_xy,
            self.max_torque_xy,
            self.max_torque_z,
        ];
        sample
            .iter()
            .zip(bounds.iter())
            .all(|(value, bound)| value.abs() <= *bound)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryData {
    pub design_code: u32,
    pub board_ver: u32,
    pub board_rev: u32,
    pub serial_number: u32,
    pub date_time: u32,
}

pub struct FtSensor {
    manager: Arc<EthInterfaceManager>,
    board: BoardId,
    scratch: PacketBuffer,
    sample: Arc<Mutex<BCastSensorData>>,
    sample_handler: HandlerId,
    settle_time: Duration,
    limits: CalibrationLimits,
}

impl FtSensor {
    /// Attach to `board` and start tracking its broadcast samples
    ///
    /// The sample handler stays installed for the facade's lifetime and is
    /// removed from the board when the facade is dropped.
    pub fn new(manager: Arc<EthInterfaceManager>, board: BoardId) -> Result<Self> {
        let sample = Arc::new(Mutex::new(BCastSensorData::default()));
        let sink = Arc::clone(&sample);
        let sample_handler = manager.install_udp_datagram_handler(board, move |packet| {
            store_sample(&sink, packet);
        })?;

        let defaults = SensorConfig::default();
        Ok(Self {
            manager,
            board,
            scratch: PacketBuffer::new(),
            sample,
            sample_handler,
            settle_time: defaults.settle_time(),
            limits: defaults.limits,
        })
    }

    pub fn with_config(self, config: &SensorConfig) -> Self {
        self.with_settle_time(config.settle_time())
            .with_limits(config.limits)
    }

    pub fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }

    pub fn with_limits(mut self, limits: CalibrationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn board_id(&self) -> BoardId {
        self.board
    }

    /// Always true; liveness is reported through the manager's timeout handler
    pub fn is_connectivity_ok(&self) -> bool {
        true
    }

    /// Latest force/torque sample in N and Nm
    pub fn get_ft_data(&self) -> FtSensorData {
        let sample = self.sample.lock();
        sample.force_torque().map(|v| v / 1000.0)
    }

    /// Latest raw channel readings, unscaled
    pub fn get_raw_ft_data(&self) -> FtSensorData {
        self.sample.lock().raw()
    }

    /// `rate` is in half milliseconds
    pub fn set_sample_stream_policy(&mut self, policy: SampleStreamPolicy, rate: u32) -> Result<()> {
        self.command(&SetSampleStreamPolicy { policy, rate })
    }

    pub fn get_sample_stream_policy(&mut self) -> Result<SampleStreamPolicy> {
        let reply: ReplyGetSampleStreamPolicy = self.transact(&GetSampleStreamPolicy::default())?;
        Ok(reply.policy)
    }

    /// Firmware release, one byte per component
    pub fn get_board_info(&mut self) -> Result<u32> {
        let reply: ReplyBoardInfo = self.transact(&GetBoardInfo::default())?;
        Ok(reply.release)
    }

    pub fn get_fault(&mut self) -> Result<u32> {
        let reply: ReplyFault = self.transact(&GetFault::default())?;
        Ok(reply.fault)
    }

    /// Clear the fault register, returning the faults still latched
    pub fn clear_fault(&mut self) -> Result<u32> {
        let reply: ReplyClearFault = self.transact(&ClearFault {
            brc: BoardReturnCode::Ok,
        })?;
        Ok(reply.fault)
    }

    /// Zero the offsets, wait for the board to settle, then check the
    /// residual on every axis
    ///
    /// Requires broadcast streaming: the residual is read from the latest
    /// sample.
    pub fn calibrate_offsets(&mut self) -> Result<()> {
        self.command(&CalibrateOffsets::default())?;
        thread::sleep(self.settle_time);

        let residual = self.sample.lock().force_torque();
        if !self.limits.accepts(&residual) {
            log::warn!(
                "Board {} offset calibration residual out of bounds: {:?}",
                self.board,
                residual
            );
            return Err(MultitorqueError::CalibrationOutOfBounds);
        }
        Ok(())
    }

    pub fn get_calibration_offsets(&mut self) -> Result<FtCalibrationOffsets> {
        let reply: ReplyGetCalibrationOffsets = self.transact(&GetCalibrationOffsets::default())?;
        Ok(reply.offsets())
    }

    pub fn set_temp_factors(&mut self, factors: [u32; FT_SENSOR_AXIS]) -> Result<SampleStreamPolicy> {
        let [t0, t1, t2, t3, t4, t5] = factors;
        let reply: ReplySetTempFactors =
            self.transact(&SetTempFactors { t0, t1, t2, t3, t4, t5 })?;
        Ok(reply.policy)
    }

    pub fn get_calibration_temp(&mut self) -> Result<i32> {
        let reply: ReplyGetCalibrationTemp = self.transact(&GetCalibrationTemp::default())?;
        Ok(reply.calibration_temp)
    }

    pub fn set_mtx_row(&mut self, row: u32, data: &FtSensorData) -> Result<()> {
        self.command(&SetCalibrationMatrixRow::from_row(row, *data))
    }

    pub fn get_mtx_row(&mut self, row: u32) -> Result<FtSensorData> {
        let reply: ReplyGetCalibrationMatrixRow =
            self.transact(&GetCalibrationMatrixRow { row })?;
        Ok(reply.coefficients())
    }

    pub fn save_params_on_flash(&mut self) -> Result<()> {
        self.command(&SaveParamsOnFlash::default())
    }

    pub fn set_ip_address(&mut self, address: Ipv4Addr) -> Result<()> {
        self.command(&SetIpAddress {
            ip_address: u32::from(address),
        })
    }

    pub fn get_ip_address(&mut self) -> Result<Ipv4Addr> {
        let reply: ReplyGetIpAddress = self.transact(&GetIpAddress::default())?;
        Ok(Ipv4Addr::from(reply.ip_address))
    }

    /// Octets 6 and 7 of `mac` are sent as zero
    pub fn set_mac_address(&mut self, mac: &MacAddress) -> Result<MacAddressReturnCode> {
        let mut octets = *mac;
        octets[6] = 0;
        octets[7] = 0;
        let reply: ReplySetMacAddress = self.transact(&SetMacAddress::from_octets(octets))?;
        Ok(reply.macrc)
    }

    pub fn get_mac_address(&mut self) -> Result<MacAddress> {
        let reply: ReplyGetMacAddress = self.transact(&GetMacAddress::default())?;
        Ok(reply.octets())
    }

    pub fn set_netmask(&mut self, netmask: Ipv4Addr) -> Result<()> {
        self.command(&SetNetmask {
            netmask: u32::from(netmask),
        })
    }

    pub fn get_netmask(&mut self) -> Result<Ipv4Addr> {
        let reply: ReplyGetNetmask = self.transact(&GetNetmask::default())?;
        Ok(Ipv4Addr::from(reply.netmask))
    }

    pub fn set_gateway(&mut self, gateway: Ipv4Addr) -> Result<()> {
        self.command(&SetGateway {
            gateway: u32::from(gateway),
        })
    }

    pub fn get_gateway(&mut self) -> Result<Ipv4Addr> {
        let reply: ReplyGetGateway = self.transact(&GetGateway::default())?;
        Ok(Ipv4Addr::from(reply.gateway))
    }

    pub fn read_inventory(&mut self) -> Result<InventoryData> {
        let reply: ReplyLoadInventoryDataFromFlash =
            self.transact(&LoadInventoryDataFromFlash::default())?;
        Ok(InventoryData {
            design_code: reply.design_code,
            board_ver: reply.board_ver,
            board_rev: reply.board_rev,
            serial_number: reply.serial_number,
            date_time: reply.date_time,
        })
    }

    pub fn write_inventory(&mut self, inventory: &InventoryData) -> Result<()> {
        self.command(&SaveInventoryDataOnFlash {
            design_code: inventory.design_code,
            board_ver: inventory.board_ver,
            board_rev: inventory.board_rev,
            serial_number: inventory.serial_number,
            date_time: inventory.date_time,
        })
    }

    /// Encode `request` into the scratch buffer and send it
    fn command<Req: WireMessage>(&mut self, request: &Req) -> Result<()> {
        self.scratch.size = request.encode(&mut self.scratch.content)?;
        self.manager
            .send_tcp_from_board(self.board, &self.scratch)
            .map_err(|e| {
                log::error!("Board {}: send {:?} failed: {}", self.board, Req::ID, e);
                e
            })?;
        Ok(())
    }

    /// Send `request`, then receive and decode the reply expected for it
    fn transact<Req: WireMessage, Rep: WireMessage>(&mut self, request: &Req) -> Result<Rep> {
        self.command(request)?;

        let board = self.board;
        self.manager
            .recv_tcp_from_board(board, &mut self.scratch)
            .map_err(|e| {
                log::error!("Board {}: receive {:?} failed: {}", board, Rep::ID, e);
                e
            })?;

        let (decoded, _) = Rep::decode(self.scratch.as_bytes())?;
        decoded.expect_id(Rep::ID)
    }
}

impl Drop for FtSensor {
    fn drop(&mut self) {
        if let Err(e) = self
            .manager
            .remove_udp_datagram_handler(self.board, self.sample_handler)
        {
            log::warn!("Board {}: sample handler not removed: {}", self.board, e);
        }
    }
}

/// Decode a streaming frame and publish it as the latest sample
fn store_sample(sample: &Mutex<BCastSensorData>, packet: &PacketBuffer) {
    match BCastSensorData::decode(packet.as_bytes()) {
        Ok((decoded, _)) if decoded.header.id == MessageId::BCastSensorData.as_u16() => {
            *sample.lock() = decoded.message;
        }
        Ok((decoded, _)) => {
            log::debug!("Ignoring datagram with message id {}", decoded.header.id);
        }
        Err(e) => log::debug!("Undecodable datagram: {}", e),
    }
}
