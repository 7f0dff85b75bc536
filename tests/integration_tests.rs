//! Loopback tests for the manager and the sensor facade
//!
//! Fake boards bind their own addresses inside 127.0.0.0/8 so the manager can
//! tell their datagrams apart by source address.

use std::io::{Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use multitorque::header::decode_header;
use multitorque::messages::*;
use multitorque::{
    EthInterfaceManager, FtSensor, InventoryData, ManagerConfig, MultitorqueError, PacketBuffer,
    NO_TRAFFIC_BOARD_ID, PACKET_MAX_SIZE,
};
use parking_lot::Mutex;

const MANAGER_IP: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);
const BOARD_A: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 2);
const BOARD_B: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 3);
const STRANGER: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 4);

mod support {
    use super::*;

    pub fn encode(message: impl Into<Message>) -> Vec<u8> {
        let mut buf = [0u8; PACKET_MAX_SIZE];
        let len = message.into().encode(&mut buf).unwrap();
        buf[..len].to_vec()
    }

    /// UDP socket sending from `address` to the manager
    pub fn datagram_source(address: Ipv4Addr) -> UdpSocket {
        UdpSocket::bind((address, 0)).unwrap()
    }

    /// Poll `condition` until it holds or two seconds pass
    pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    pub type Responder = Box<dyn Fn(&Message) -> Option<Message> + Send>;

    /// A board answering TCP requests on `address` and streaming from the same address
    pub struct FakeBoard {
        pub address: Ipv4Addr,
        pub tcp_port: u16,
        pub udp: UdpSocket,
        pub requests: Arc<Mutex<Vec<Message>>>,
    }

    impl FakeBoard {
        pub fn spawn(address: Ipv4Addr, respond: Responder) -> Self {
            let listener = TcpListener::bind((address, 0)).unwrap();
            let tcp_port = listener.local_addr().unwrap().port();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&requests);

            thread::spawn(move || {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut buf = [0u8; 1024];
                loop {
                    let n = match stream.read(&mut buf) {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    // Back-to-back commands may share one read
                    let mut offset = 0;
                    while offset < n {
                        let (header, _) = decode_header(&buf[offset..n]).unwrap();
                        let end = offset + usize::from(header.size);
                        let (request, _) = Message::decode(&buf[offset..end]).unwrap();
                        offset = end;

                        log.lock().push(request.message);
                        if let Some(reply) = respond(&request.message) {
                            if stream.write_all(&encode(reply)).is_err() {
                                return;
                            }
                        }
                    }
                }
            });

            Self {
                address,
                tcp_port,
                udp: datagram_source(address),
                requests,
            }
        }

        pub fn udp_port(&self) -> u16 {
            self.udp.local_addr().unwrap().port()
        }

        pub fn stream(&self, to: SocketAddr, sample: BCastSensorData) {
            self.udp.send_to(&encode(sample), to).unwrap();
        }
    }

    /// Replies the way a healthy board does
    pub fn well_behaved(request: &Message) -> Option<Message> {
        let reply: Message = match request {
            Message::GetBoardInfo(_) => ReplyBoardInfo { release: 0x0001_0203 }.into(),
            Message::GetFault(_) => ReplyFault { fault: 0x10 }.into(),
            Message::ClearFault(_) => ReplyClearFault { fault: 0 }.into(),
            Message::GetSampleStreamPolicy(_) => ReplyGetSampleStreamPolicy {
                policy: SampleStreamPolicy::Normal,
            }
            .into(),
            Message::SetTempFactors(_) => ReplySetTempFactors {
                policy: SampleStreamPolicy::Normal,
            }
            .into(),
            Message::GetCalibrationTemp(_) => ReplyGetCalibrationTemp {
                calibration_temp: -12,
            }
            .into(),
            Message::GetCalibrationOffsets(_) => ReplyGetCalibrationOffsets {
                c0: 1,
                c1: 2,
                c2: 3,
                c3: 4,
                c4: 5,
                c5: 6,
            }
            .into(),
            Message::GetCalibrationMatrixRow(request) => ReplyGetCalibrationMatrixRow {
                row: request.row,
                c0: 0.5,
                c1: -1.25,
                c2: 2.0,
                c3: 0.0,
                c4: 1.0e-3,
                c5: 42.0,
            }
            .into(),
            Message::GetIpAddress(_) => ReplyGetIpAddress {
                ip_address: 0xC0A8_6F01,
            }
            .into(),
            Message::GetNetmask(_) => ReplyGetNetmask {
                netmask: 0xFFFF_FF00,
            }
            .into(),
            Message::GetGateway(_) => ReplyGetGateway {
                gateway: 0xC0A8_6FFE,
            }
            .into(),
            Message::SetMacAddress(_) => ReplySetMacAddress {
                macrc: MacAddressReturnCode::Ok,
            }
            .into(),
            Message::GetMacAddress(_) => ReplyGetMacAddress {
                m0: 0x00,
                m1: 0x11,
                m2: 0x22,
                m3: 0x33,
                m4: 0x44,
                m5: 0x55,
                m6: 0,
                m7: 0,
            }
            .into(),
            Message::LoadInventoryDataFromFlash(_) => ReplyLoadInventoryDataFromFlash {
                design_code: 7,
                board_ver: 2,
                board_rev: 1,
                serial_number: 1234,
                date_time: 20_190_301,
            }
            .into(),
            _ => return None,
        };
        Some(reply)
    }

    /// Manager on the loopback interface with one facade per fake board
    pub fn connect_sensor(board: &FakeBoard) -> (Arc<EthInterfaceManager>, FtSensor) {
        let manager = EthInterfaceManager::new(MANAGER_IP, 0)
            .with_tcp_read_timeout(Some(Duration::from_secs(2)));
        let id = manager
            .add_board(board.address, true, board.tcp_port, true, board.udp_port())
            .unwrap();
        manager.connect_all().unwrap();

        let manager = Arc::new(manager);
        let sensor = FtSensor::new(Arc::clone(&manager), id)
            .unwrap()
            .with_settle_time(Duration::from_millis(10));
        (manager, sensor)
    }
}

use support::*;

mod liveness {
    use super::*;

    #[test]
    fn test_silent_board_reported_once_per_poll() {
        let timeout = Duration::from_millis(100);
        let manager = EthInterfaceManager::new(MANAGER_IP, 0).with_timeout(timeout);
        let a = manager.add_board(BOARD_A, false, 0, true, 1).unwrap();
        let b = manager.add_board(BOARD_B, false, 0, true, 1).unwrap();
        manager.connect_all().unwrap();
        let to = manager.local_addr().unwrap();

        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        manager.install_timeout_handler(move |board| sink.lock().push(board));
        let installed = Instant::now();

        let source_a = datagram_source(BOARD_A);
        let frame = encode(BCastSensorData::default());
        let mut packet = PacketBuffer::new();
        let mut expired_polls = 0;

        while installed.elapsed() < Duration::from_millis(400) {
            source_a.send_to(&frame, to).unwrap();
            let expired = installed.elapsed() > timeout + Duration::from_millis(20);

            fired.lock().clear();
            assert_eq!(manager.recv_udp(&mut packet).unwrap(), frame.len());

            let fired = fired.lock().clone();
            assert!(!fired.contains(&a), "streaming board reported silent");
            assert!(!fired.contains(&NO_TRAFFIC_BOARD_ID));
            let b_count = fired.iter().filter(|id| **id == b).count();
            assert!(b_count <= 1);
            if expired {
                assert_eq!(b_count, 1);
                expired_polls += 1;
            }

            thread::sleep(Duration::from_millis(20));
        }
        assert!(expired_polls > 0);
    }

    #[test]
    fn test_install_resets_baseline() {
        let timeout = Duration::from_millis(100);
        let manager = EthInterfaceManager::new(MANAGER_IP, 0).with_timeout(timeout);
        manager.add_board(BOARD_B, false, 0, true, 1).unwrap();
        manager.connect_all().unwrap();
        let to = manager.local_addr().unwrap();

        // Stale baseline from add_board
        thread::sleep(Duration::from_millis(220));

        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        manager.install_timeout_handler(move |board| sink.lock().push(board));

        datagram_source(STRANGER)
            .send_to(&encode(GetBoardInfo::default()), to)
            .unwrap();
        let mut packet = PacketBuffer::new();
        manager.recv_udp(&mut packet).unwrap();
        assert!(fired.lock().is_empty());
    }

    #[test]
    fn test_no_traffic_reports_sentinel() {
        let manager =
            EthInterfaceManager::new(MANAGER_IP, 0).with_timeout(Duration::from_millis(30));
        manager.add_board(BOARD_A, false, 0, true, 1).unwrap();
        manager.connect_all().unwrap();

        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        manager.install_timeout_handler(move |board| sink.lock().push(board));

        let mut packet = PacketBuffer::new();
        let started = Instant::now();
        assert!(matches!(
            manager.recv_udp(&mut packet),
            Err(MultitorqueError::RecvTimeout)
        ));
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(*fired.lock(), vec![NO_TRAFFIC_BOARD_ID]);
    }
}

mod demultiplexing {
    use super::*;

    fn recording_handler(
        manager: &EthInterfaceManager,
        board: usize,
    ) -> Arc<Mutex<Vec<Vec<u8>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager
            .install_udp_datagram_handler(board, move |packet| {
                sink.lock().push(packet.as_bytes().to_vec());
            })
            .unwrap();
        seen
    }

    #[test]
    fn test_datagrams_reach_only_their_board() {
        let manager =
            EthInterfaceManager::new(MANAGER_IP, 0).with_timeout(Duration::from_millis(100));
        let a = manager.add_board(BOARD_A, false, 0, true, 1).unwrap();
        let b = manager.add_board(BOARD_B, false, 0, true, 1).unwrap();
        manager.connect_all().unwrap();
        let to = manager.local_addr().unwrap();

        let seen_a = recording_handler(&manager, a);
        let seen_b = recording_handler(&manager, b);

        let frame_a = encode(ReplyFault { fault: 0xA });
        let frame_b = encode(ReplyFault { fault: 0xB });
        datagram_source(BOARD_A).send_to(&frame_a, to).unwrap();
        datagram_source(BOARD_B).send_to(&frame_b, to).unwrap();
        datagram_source(STRANGER)
            .send_to(&encode(ReplyFault { fault: 0xC }), to)
            .unwrap();

        let mut packet = PacketBuffer::new();
        for _ in 0..3 {
            manager.recv_udp(&mut packet).unwrap();
        }

        assert_eq!(*seen_a.lock(), vec![frame_a]);
        assert_eq!(*seen_b.lock(), vec![frame_b]);
    }

    #[test]
    fn test_only_sender_timestamp_refreshed() {
        let timeout = Duration::from_millis(60);
        let manager = EthInterfaceManager::new(MANAGER_IP, 0).with_timeout(timeout);
        let a = manager.add_board(BOARD_A, false, 0, true, 1).unwrap();
        manager.add_board(BOARD_B, false, 0, true, 1).unwrap();
        manager.connect_all().unwrap();
        let to = manager.local_addr().unwrap();

        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        manager.install_timeout_handler(move |board| sink.lock().push(board));
        thread::sleep(timeout + Duration::from_millis(40));

        datagram_source(BOARD_B)
            .send_to(&encode(BCastSensorData::default()), to)
            .unwrap();
        let mut packet = PacketBuffer::new();
        manager.recv_udp(&mut packet).unwrap();

        assert_eq!(*fired.lock(), vec![a]);
    }

    #[test]
    fn test_handlers_dispatch_in_registration_order() {
        let manager = EthInterfaceManager::new(MANAGER_IP, 0);
        let a = manager.add_board(BOARD_A, false, 0, true, 1).unwrap();
        manager.connect_all().unwrap();
        let to = manager.local_addr().unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..4 {
            let order = Arc::clone(&order);
            manager
                .install_udp_datagram_handler(a, move |_| order.lock().push(tag))
                .unwrap();
        }

        datagram_source(BOARD_A)
            .send_to(&encode(GetFault::default()), to)
            .unwrap();
        let mut packet = PacketBuffer::new();
        manager.recv_udp(&mut packet).unwrap();

        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }
}

mod receive_thread {
    use super::*;

    #[test]
    fn test_thread_delivers_datagrams() {
        let manager = EthInterfaceManager::new(MANAGER_IP, 0);
        let a = manager.add_board(BOARD_A, false, 0, true, 1).unwrap();
        manager.connect_all().unwrap();
        let to = manager.local_addr().unwrap();

        let count = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&count);
        manager
            .install_udp_datagram_handler(a, move |_| *sink.lock() += 1)
            .unwrap();

        manager.start_recv_thread().unwrap();
        assert!(manager.is_receiving());

        let source = datagram_source(BOARD_A);
        for _ in 0..5 {
            source
                .send_to(&encode(BCastSensorData::default()), to)
                .unwrap();
        }
        assert!(wait_for(|| *count.lock() == 5));

        manager.stop_recv_thread();
        assert!(!manager.is_receiving());
    }

    #[test]
    fn test_shutdown_latency_bounded_by_timeout() {
        let timeout = Duration::from_millis(50);
        let manager = EthInterfaceManager::new(MANAGER_IP, 0).with_timeout(timeout);
        manager.add_board(BOARD_A, false, 0, true, 1).unwrap();
        manager.connect_all().unwrap();

        let polls = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&polls);
        manager.install_timeout_handler(move |_| *sink.lock() += 1);

        manager.start_recv_thread().unwrap();
        assert!(wait_for(|| *polls.lock() >= 2));

        let started = Instant::now();
        manager.stop_recv_thread();
        let latency = started.elapsed();
        assert!(latency < timeout * 5, "stop took {:?}", latency);

        let after_stop = *polls.lock();
        thread::sleep(timeout * 3);
        assert_eq!(*polls.lock(), after_stop);
    }

    #[test]
    fn test_drop_stops_callbacks() {
        let timeout = Duration::from_millis(30);
        let manager = EthInterfaceManager::new(MANAGER_IP, 0).with_timeout(timeout);
        manager.bind().unwrap();

        let polls = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&polls);
        manager.install_timeout_handler(move |_| *sink.lock() += 1);
        manager.start_recv_thread().unwrap();
        assert!(wait_for(|| *polls.lock() >= 1));

        drop(manager);
        let after_drop = *polls.lock();
        thread::sleep(timeout * 3);
        assert_eq!(*polls.lock(), after_drop);
    }

    #[test]
    fn test_pending_tcp_reply_does_not_stall_streaming() {
        let silent = FakeBoard::spawn(BOARD_A, Box::new(|_: &Message| None));
        let manager = EthInterfaceManager::new(MANAGER_IP, 0)
            .with_tcp_read_timeout(Some(Duration::from_secs(3)));
        let a = manager
            .add_board(silent.address, true, silent.tcp_port, true, silent.udp_port())
            .unwrap();
        let b = manager.add_board(BOARD_B, false, 0, true, 1).unwrap();
        manager.connect_all().unwrap();
        let manager = Arc::new(manager);
        let to = manager.local_addr().unwrap();

        let count = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&count);
        manager
            .install_udp_datagram_handler(b, move |_| *sink.lock() += 1)
            .unwrap();
        manager.start_recv_thread().unwrap();

        let mut sensor_a = FtSensor::new(Arc::clone(&manager), a).unwrap();
        let blocked = thread::spawn(move || sensor_a.get_board_info());
        assert!(wait_for(|| !silent.requests.lock().is_empty()));

        let started = Instant::now();
        let sensor_b = FtSensor::new(Arc::clone(&manager), b).unwrap();
        let attach = started.elapsed();
        assert!(attach < Duration::from_secs(1), "attach took {:?}", attach);

        let source = datagram_source(BOARD_B);
        for i in 1..=5 {
            let sample = BCastSensorData {
                fx: 1000.0 * i as f32,
                ..Default::default()
            };
            source.send_to(&encode(sample), to).unwrap();
        }
        assert!(wait_for(|| *count.lock() == 5));
        assert!(wait_for(|| sensor_b.get_ft_data()[0] == 5.0));
        assert!(!blocked.is_finished());

        assert!(blocked.join().unwrap().is_err());
        manager.stop_recv_thread();
    }

    #[test]
    fn test_start_twice_is_harmless() {
        let manager =
            EthInterfaceManager::new(MANAGER_IP, 0).with_timeout(Duration::from_millis(20));
        manager.bind().unwrap();
        manager.start_recv_thread().unwrap();
        manager.start_recv_thread().unwrap();
        manager.stop_recv_thread();
        assert!(!manager.is_receiving());
    }
}

mod facade {
    use super::*;

    #[test]
    fn test_request_reply_transactions() {
        let board = FakeBoard::spawn(BOARD_A, Box::new(well_behaved));
        let (_manager, mut sensor) = connect_sensor(&board);

        assert_eq!(sensor.get_board_info().unwrap(), 0x0001_0203);
        assert_eq!(sensor.get_fault().unwrap(), 0x10);
        assert_eq!(sensor.clear_fault().unwrap(), 0);
        assert_eq!(
            sensor.get_sample_stream_policy().unwrap(),
            SampleStreamPolicy::Normal
        );
        assert_eq!(
            sensor.set_temp_factors([1, 2, 3, 4, 5, 6]).unwrap(),
            SampleStreamPolicy::Normal
        );
        assert_eq!(sensor.get_calibration_temp().unwrap(), -12);
        assert_eq!(sensor.get_calibration_offsets().unwrap(), [1, 2, 3, 4, 5, 6]);
        assert_eq!(
            sensor.get_mtx_row(3).unwrap(),
            [0.5, -1.25, 2.0, 0.0, 1.0e-3, 42.0]
        );
        assert_eq!(
            sensor.get_ip_address().unwrap(),
            Ipv4Addr::new(192, 168, 111, 1)
        );
        assert_eq!(
            sensor.get_netmask().unwrap(),
            Ipv4Addr::new(255, 255, 255, 0)
        );
        assert_eq!(
            sensor.get_gateway().unwrap(),
            Ipv4Addr::new(192, 168, 111, 254)
        );
        assert_eq!(
            sensor.get_mac_address().unwrap(),
            [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0, 0]
        );
        assert_eq!(
            sensor.read_inventory().unwrap(),
            InventoryData {
                design_code: 7,
                board_ver: 2,
                board_rev: 1,
                serial_number: 1234,
                date_time: 20_190_301,
            }
        );

        let requests = board.requests.lock();
        assert!(matches!(
            requests[7],
            Message::GetCalibrationMatrixRow(GetCalibrationMatrixRow { row: 3 })
        ));
    }

    #[test]
    fn test_commands_reach_the_board() {
        let board = FakeBoard::spawn(BOARD_A, Box::new(well_behaved));
        let (_manager, mut sensor) = connect_sensor(&board);

        sensor
            .set_sample_stream_policy(SampleStreamPolicy::Normal, 2)
            .unwrap();
        sensor.set_ip_address(Ipv4Addr::new(192, 168, 1, 1)).unwrap();
        sensor.set_netmask(Ipv4Addr::new(255, 255, 0, 0)).unwrap();
        sensor.set_gateway(Ipv4Addr::new(192, 168, 1, 254)).unwrap();
        sensor.set_mtx_row(1, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        sensor.save_params_on_flash().unwrap();
        sensor
            .write_inventory(&InventoryData {
                design_code: 9,
                board_ver: 3,
                board_rev: 2,
                serial_number: 77,
                date_time: 1,
            })
            .unwrap();
        assert_eq!(
            sensor
                .set_mac_address(&[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x12, 0x34])
                .unwrap(),
            MacAddressReturnCode::Ok
        );

        let requests = board.requests.lock().clone();
        assert_eq!(requests.len(), 8);
        assert_eq!(
            requests[0],
            Message::from(SetSampleStreamPolicy {
                policy: SampleStreamPolicy::Normal,
                rate: 2
            })
        );
        assert_eq!(requests[1], Message::from(SetIpAddress { ip_address: 0xC0A8_0101 }));
        assert_eq!(requests[2], Message::from(SetNetmask { netmask: 0xFFFF_0000 }));
        assert_eq!(requests[3], Message::from(SetGateway { gateway: 0xC0A8_01FE }));
        assert_eq!(
            requests[4],
            Message::from(SetCalibrationMatrixRow::from_row(1, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
        );
        assert_eq!(requests[5], Message::from(SaveParamsOnFlash::default()));
        assert_eq!(
            requests[6],
            Message::from(SaveInventoryDataOnFlash {
                design_code: 9,
                board_ver: 3,
                board_rev: 2,
                serial_number: 77,
                date_time: 1,
            })
        );
        assert_eq!(
            requests[7],
            Message::from(SetMacAddress::from_octets([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0, 0]))
        );
    }

    #[test]
    fn test_mismatched_reply_is_rejected() {
        let board = FakeBoard::spawn(
            BOARD_A,
            Box::new(|_: &Message| Some(ReplyFault { fault: 0xDEAD }.into())),
        );
        let (_manager, mut sensor) = connect_sensor(&board);

        assert!(matches!(
            sensor.get_board_info(),
            Err(MultitorqueError::ProtocolMismatch {
                expected: 2,
                actual: 6
            })
        ));
    }

    #[test]
    fn test_streaming_and_calibration_bounds() {
        let board = FakeBoard::spawn(BOARD_A, Box::new(well_behaved));
        let (manager, mut sensor) = connect_sensor(&board);
        manager.start_recv_thread().unwrap();
        let to = manager.local_addr().unwrap();

        board.stream(
            to,
            BCastSensorData {
                fx: 1500.0,
                fz: -2000.0,
                tz: 250.0,
                raw0: 11.0,
                ..Default::default()
            },
        );
        assert!(wait_for(|| sensor.get_ft_data()[0] == 1.5));
        let data = sensor.get_ft_data();
        assert_eq!(data[2], -2.0);
        assert_eq!(data[5], 0.25);
        assert_eq!(sensor.get_raw_ft_data()[0], 11.0);
        sensor.calibrate_offsets().unwrap();

        board.stream(
            to,
            BCastSensorData {
                fz: 40000.0,
                ..Default::default()
            },
        );
        assert!(wait_for(|| sensor.get_ft_data()[2] == 40.0));
        assert!(matches!(
            sensor.calibrate_offsets(),
            Err(MultitorqueError::CalibrationOutOfBounds)
        ));
        assert!(matches!(
            board.requests.lock().last(),
            Some(Message::CalibrateOffsets(_))
        ));

        manager.stop_recv_thread();
    }

    #[test]
    fn test_unicast_udp_to_board() {
        let board = FakeBoard::spawn(BOARD_A, Box::new(well_behaved));
        board
            .udp
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let (manager, sensor) = connect_sensor(&board);

        let packet = PacketBuffer::from_slice(&encode(GetBoardInfo::default()));
        assert_eq!(
            manager
                .send_udp_from_board(sensor.board_id(), &packet)
                .unwrap(),
            4
        );

        let mut buf = [0u8; 16];
        let (n, from) = board.udp.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], packet.as_bytes());
        assert_eq!(from, manager.local_addr().unwrap());
    }
}

mod configuration {
    use super::*;

    #[test]
    fn test_manager_from_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
local_address = "127.0.0.1"
port = 0
timeout_ms = 25

[[boards]]
address = "127.0.0.2"
tcp_service = false
udp_service = true
udp_port = 9000

[[boards]]
address = "127.0.0.3"
tcp_service = false

[sensor]
settle_time_ms = 5
tcp_read_timeout_ms = 500

[sensor.limits]
max_force_z = 1000.0
"#
        )
        .unwrap();

        let config = ManagerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.sensor.limits.max_force_z, 1000.0);
        assert_eq!(config.sensor.limits.max_force_xy, 50000.0);

        let manager = EthInterfaceManager::from_config(&config).unwrap();
        assert_eq!(manager.num_boards(), 2);
        assert_eq!(manager.timeout(), Duration::from_millis(25));

        manager.connect_all().unwrap();
        let bound = manager.local_addr().unwrap();
        assert_eq!(bound.ip(), MANAGER_IP);
        assert_ne!(bound.port(), 0);
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multitorque.toml");

        let mut config = ManagerConfig::new(MANAGER_IP);
        config
            .boards
            .push(multitorque::BoardConfig::new(BOARD_A, 64321));
        config.sensor.tcp_read_timeout_ms = Some(250);
        config.to_file(&path).unwrap();

        assert_eq!(ManagerConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ManagerConfig::from_file(dir.path().join("absent.toml")),
            Err(MultitorqueError::Config(_))
        ));
    }
}
