/// Multitorque message catalog
///
/// Odd ids are commands (and the sensor broadcast), the following even id is
/// usually the matching reply. Commands without a reply (`SetIpAddress`,
/// `SaveParamsOnFlash`, ...) break the pairing, which is why the ids are
/// listed explicitly rather than derived.
///
/// Every struct here is a plain value; its header is produced on encode and
/// returned alongside the message on decode (see [`Decoded`]).
use crate::base_types::{WireScalar, SLOT_SIZE};
use crate::codec::{Decoded, Decoder, Encoder, WireMessage};
use crate::errors::{MultitorqueError, Result};
use crate::header::decode_header;

/// Message identifiers carried in the 12-bit header id field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageId {
    GetBoardInfo = 1,
    ReplyBoardInfo = 2,
    CalibrateOffsets = 3,
    ReplyCalibrateOffsets = 4,
    GetFault = 5,
    ReplyFault = 6,
    ClearFault = 7,
    ReplyClearFault = 8,
    SetSampleStreamPolicy = 9,
    ReplySetSampleStreamPolicy = 10,
    GetSampleStreamPolicy = 11,
    ReplyGetSampleStreamPolicy = 12,
    SetTempFactors = 13,
    ReplySetTempFactors = 14,
    GetCalibrationTemp = 15,
    ReplyGetCalibrationTemp = 16,
    SetCalibrationMatrixRow = 17,
    ReplySetCalibrationMatrixRow = 18,
    GetCalibrationMatrixRow = 19,
    ReplyGetCalibrationMatrixRow = 20,
    GetCalibrationOffsets = 21,
    ReplyGetCalibrationOffsets = 22,
    BCastSensorData = 23,
    SaveParamsOnFlash = 24,
    SetIpAddress = 25,
    GetIpAddress = 26,
    ReplyGetIpAddress = 27,
    SetMacAddress = 28,
    ReplySetMacAddress = 29,
    GetMacAddress = 30,
    ReplyGetMacAddress = 31,
    SetNetmask = 32,
    GetNetmask = 33,
    ReplyGetNetmask = 34,
    SetGateway = 35,
    GetGateway = 36,
    ReplyGetGateway = 37,
    SaveInventoryDataOnFlash = 38,
    LoadInventoryDataFromFlash = 39,
    ReplyLoadInventoryDataFromFlash = 40,
}

impl MessageId {
    /// Every id in wire order
    pub const ALL: [MessageId; 40] = [
        Self::GetBoardInfo,
        Self::ReplyBoardInfo,
        Self::CalibrateOffsets,
        Self::ReplyCalibrateOffsets,
        Self::GetFault,
        Self::ReplyFault,
        Self::ClearFault,
        Self::ReplyClearFault,
        Self::SetSampleStreamPolicy,
        Self::ReplySetSampleStreamPolicy,
        Self::GetSampleStreamPolicy,
        Self::ReplyGetSampleStreamPolicy,
        Self::SetTempFactors,
        Self::ReplySetTempFactors,
        Self::GetCalibrationTemp,
        Self::ReplyGetCalibrationTemp,
        Self::SetCalibrationMatrixRow,
        Self::ReplySetCalibrationMatrixRow,
        Self::GetCalibrationMatrixRow,
        Self::ReplyGetCalibrationMatrixRow,
        Self::GetCalibrationOffsets,
        Self::ReplyGetCalibrationOffsets,
        Self::BCastSensorData,
        Self::SaveParamsOnFlash,
        Self::SetIpAddress,
        Self::GetIpAddress,
        Self::ReplyGetIpAddress,
        Self::SetMacAddress,
        Self::ReplySetMacAddress,
        Self::GetMacAddress,
        Self::ReplyGetMacAddress,
        Self::SetNetmask,
        Self::GetNetmask,
        Self::ReplyGetNetmask,
        Self::SetGateway,
        Self::GetGateway,
        Self::ReplyGetGateway,
        Self::SaveInventoryDataOnFlash,
        Self::LoadInventoryDataFromFlash,
        Self::ReplyLoadInventoryDataFromFlash,
    ];

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for MessageId {
    type Error = MultitorqueError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            1..=40 => Ok(Self::ALL[usize::from(value) - 1]),
            _ => Err(MultitorqueError::UnknownMessageId(value)),
        }
    }
}

/// Enumerations travel as 32-bit signed integers. Decoding is strict: an
/// integer with no matching enumerator is an `InvalidEnumValue` error.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl TryFrom<i32> for $name {
            type Error = MultitorqueError;

            fn try_from(value: i32) -> Result<Self> {
                $(
                    if value == $value {
                        return Ok(Self::$variant);
                    }
                )+
                Err(MultitorqueError::InvalidEnumValue {
                    kind: stringify!($name),
                    value,
                })
            }
        }

        impl WireScalar for $name {
            const PHYSICAL_BYTES: usize = 4;
            const STREAM_ADVANCE: usize = SLOT_SIZE;

            fn encode(self, binary: &mut [u8]) -> Result<usize> {
                (self as i32).encode(binary)
            }

            fn decode(binary: &[u8]) -> Result<(Self, usize)> {
                let (raw, read) = i32::decode(binary)?;
                Ok((Self::try_from(raw)?, read))
            }
        }
    };
}

wire_enum! {
    /// Generic command outcome reported by the board
    BoardReturnCode {
        #[default]
        Ok = 0,
        Err = 1,
    }
}

wire_enum! {
    ProtocolVersion {
        #[default]
        Release = 1,
    }
}

wire_enum! {
    /// Broadcast streaming on/off
    SampleStreamPolicy {
        #[default]
        Off = 0,
        Normal = 1,
    }
}

wire_enum! {
    MacAddressReturnCode {
        #[default]
        Ok = 0,
        Err = 1,
    }
}

/// Declares the catalog: one struct per message (fields in wire order), its
/// `WireMessage` impl, and the `Message` union routed on the header id.
macro_rules! wire_messages {
    (
        $(
            $(#[$meta:meta])*
            $name:ident { $($field:ident: $ty:ty),* $(,)? }
        )*
    ) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq)]
            pub struct $name {
                $(pub $field: $ty,)*
            }

            impl WireMessage for $name {
                const ID: MessageId = MessageId::$name;

                #[allow(unused_variables)]
                fn encode_fields(&self, encoder: &mut Encoder<'_>) -> Result<()> {
                    $(encoder.put(self.$field)?;)*
                    Ok(())
                }

                #[allow(unused_variables)]
                fn decode_fields(decoder: &mut Decoder<'_>) -> Result<Self> {
                    Ok(Self {
                        $($field: decoder.get()?,)*
                    })
                }
            }

            impl From<$name> for Message {
                fn from(message: $name) -> Self {
                    Self::$name(message)
                }
            }
        )*

        /// Any catalog message
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub enum Message {
            $($name($name),)*
        }

        impl Message {
            pub fn id(&self) -> MessageId {
                match self {
                    $(Self::$name(_) => MessageId::$name,)*
                }
            }

            pub fn encode(&self, binary: &mut [u8]) -> Result<usize> {
                match self {
                    $(Self::$name(message) => message.encode(binary),)*
                }
            }

            /// Decode a frame of any type, routed on its header id
            pub fn decode(binary: &[u8]) -> Result<(Decoded<Message>, usize)> {
                let (header, _) = decode_header(binary)?;
                match MessageId::try_from(header.id)? {
                    $(
                        MessageId::$name => {
                            let (decoded, read) = $name::decode(binary)?;
                            Ok((decoded.map(Self::$name), read))
                        }
                    )*
                }
            }
        }
    };
}

wire_messages! {
    GetBoardInfo {}

    /// Firmware release, one byte per component
    ReplyBoardInfo { release: u32 }

    CalibrateOffsets {}

    ReplyCalibrateOffsets { brc: BoardReturnCode }

    GetFault {}

    ReplyFault { fault: u32 }

    ClearFault { brc: BoardReturnCode }

    ReplyClearFault { fault: u32 }

    /// `rate` is expressed in half milliseconds
    SetSampleStreamPolicy { policy: SampleStreamPolicy, rate: u32 }

    ReplySetSampleStreamPolicy { brc: BoardReturnCode }

    GetSampleStreamPolicy {}

    ReplyGetSampleStreamPolicy { policy: SampleStreamPolicy }

    SetTempFactors { t0: u32, t1: u32, t2: u32, t3: u32, t4: u32, t5: u32 }

    ReplySetTempFactors { policy: SampleStreamPolicy }

    GetCalibrationTemp {}

    ReplyGetCalibrationTemp { calibration_temp: i32 }

    SetCalibrationMatrixRow { row: u32, c0: f32, c1: f32, c2: f32, c3: f32, c4: f32, c5: f32 }

    ReplySetCalibrationMatrixRow { brc: BoardReturnCode }

    GetCalibrationMatrixRow { row: u32 }

    ReplyGetCalibrationMatrixRow { row: u32, c0: f32, c1: f32, c2: f32, c3: f32, c4: f32, c5: f32 }

    GetCalibrationOffsets {}

    ReplyGetCalibrationOffsets { c0: u32, c1: u32, c2: u32, c3: u32, c4: u32, c5: u32 }

    /// Streaming sample: force in mN, torque in mNm, then the six raw channels
    BCastSensorData {
        fx: f32, fy: f32, fz: f32,
        tx: f32, ty: f32, tz: f32,
        raw0: f32, raw1: f32, raw2: f32, raw3: f32, raw4: f32, raw5: f32,
    }

    SaveParamsOnFlash {}

    /// Host-order value of the dotted quad (192.168.1.1 is 0xC0A80101)
    SetIpAddress { ip_address: u32 }

    GetIpAddress {}

    ReplyGetIpAddress { ip_address: u32 }

    SetMacAddress { m0: u8, m1: u8, m2: u8, m3: u8, m4: u8, m5: u8, m6: u8, m7: u8 }

    ReplySetMacAddress { macrc: MacAddressReturnCode }

    GetMacAddress {}

    ReplyGetMacAddress { m0: u8, m1: u8, m2: u8, m3: u8, m4: u8, m5: u8, m6: u8, m7: u8 }

    SetNetmask { netmask: u32 }

    GetNetmask {}

    ReplyGetNetmask { netmask: u32 }

    SetGateway { gateway: u32 }

    GetGateway {}

    ReplyGetGateway { gateway: u32 }

    SaveInventoryDataOnFlash {
        design_code: u32,
        board_ver: u32,
        board_rev: u32,
        serial_number: u32,
        date_time: u32,
    }

    LoadInventoryDataFromFlash {}

    ReplyLoadInventoryDataFromFlash {
        design_code: u32,
        board_ver: u32,
        board_rev: u32,
        serial_number: u32,
        date_time: u32,
    }
}

impl SetMacAddress {
    pub fn from_octets(mac: [u8; 8]) -> Self {
        let [m0, m1, m2, m3, m4, m5, m6, m7] = mac;
        Self { m0, m1, m2, m3, m4, m5, m6, m7 }
    }
}

impl ReplyGetMacAddress {
    pub fn octets(&self) -> [u8; 8] {
        [self.m0, self.m1, self.m2, self.m3, self.m4, self.m5, self.m6, self.m7]
    }
}

impl SetCalibrationMatrixRow {
    pub fn from_row(row: u32, c: [f32; 6]) -> Self {
        Self {
            row,
            c0: c[0],
            c1: c[1],
            c2: c[2],
            c3: c[3],
            c4: c[4],
            c5: c[5],
        }
    }
}

impl ReplyGetCalibrationMatrixRow {
    pub fn coefficients(&self) -> [f32; 6] {
        [self.c0, self.c1, self.c2, self.c3, self.c4, self.c5]
    }
}

impl ReplyGetCalibrationOffsets {
    pub fn offsets(&self) -> [u32; 6] {
        [self.c0, self.c1, self.c2, self.c3, self.c4, self.c5]
    }
}

impl BCastSensorData {
    /// Fx, Fy, Fz, Tx, Ty, Tz in raw board units
    pub fn force_torque(&self) -> [f32; 6] {
        [self.fx, self.fy, self.fz, self.tx, self.ty, self.tz]
    }

    pub fn raw(&self) -> [f32; 6] {
        [self.raw0, self.raw1, self.raw2, self.raw3, self.raw4, self.raw5]
    }
}
