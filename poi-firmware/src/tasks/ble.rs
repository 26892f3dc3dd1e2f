//! BLE peripheral task
//!
//! Runs the host stack, advertises the poi service, and serves one
//! connection at a time. Every RX write is handed to the connection's
//! [`LinkSession`]; a write it cannot take is rejected at the ATT layer so
//! the peer retries it.

use bt_hci::controller::ExternalController;
use cyw43::bluetooth::BtDriver;
use defmt::*;
use embassy_futures::join::join;
use embassy_time::Timer;
use static_cell::StaticCell;
use trouble_host::prelude::*;

use poi_core::config::PoiConfig;
use poi_protocol::Reply;

use crate::ble::{advertising_data, LinkSession, PoiServer, ReplyValue, WriteOutcome};
use crate::tasks::uptime_ms;

/// HCI controller on top of the CYW43 radio
pub type BleController = ExternalController<BtDriver<'static>, 10>;

const CONNECTIONS_MAX: usize = 1;
const L2CAP_CHANNELS_MAX: usize = 2;

/// Fixed static random address
const ADDRESS: [u8; 6] = [0xff, 0x8f, 0x1a, 0x05, 0xe4, 0xff];

const ADVERTISE_RETRY_MS: u64 = 1000;

#[embassy_executor::task]
pub async fn ble_task(controller: BleController, config: &'static PoiConfig) {
    info!("BLE task started");

    static RESOURCES: StaticCell<
        HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX>,
    > = StaticCell::new();
    let resources = RESOURCES.init(HostResources::new());

    let stack =
        trouble_host::new(controller, resources).set_random_address(Address::random(ADDRESS));
    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    let server = match PoiServer::new_with_config(GapConfig::Peripheral(PeripheralConfig {
        name: config.device_name.as_str(),
        appearance: &appearance::light_source::GENERIC_LIGHT_SOURCE,
    })) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create GATT server: {:?}", e);
            return;
        }
    };

    let mut adv_data = [0u8; 31];
    let mut scan_data = [0u8; 31];
    let (adv_len, scan_len) =
        match advertising_data(config.device_name.as_str(), &mut adv_data, &mut scan_data) {
            Ok(lens) => lens,
            Err(e) => {
                error!("Failed to encode advertising data: {:?}", e);
                return;
            }
        };

    info!("BLE stack ready, advertising as {}", config.device_name.as_str());

    let host = async {
        loop {
            if let Err(e) = runner.run().await {
                error!("BLE host error: {:?}", e);
            }
        }
    };

    let peripheral_loop = async {
        let mut session = LinkSession::new(config);
        loop {
            let advertiser = match peripheral
                .advertise(
                    &Default::default(),
                    Advertisement::ConnectableScannableUndirected {
                        adv_data: &adv_data[..adv_len],
                        scan_data: &scan_data[..scan_len],
                    },
                )
                .await
            {
                Ok(advertiser) => advertiser,
                Err(e) => {
                    warn!("Advertising failed: {:?}", e);
                    Timer::after_millis(ADVERTISE_RETRY_MS).await;
                    continue;
                }
            };

            let conn = match advertiser.accept().await {
                Ok(conn) => match conn.with_attribute_server(&server) {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("GATT setup failed: {:?}", e);
                        continue;
                    }
                },
                Err(e) => {
                    warn!("Accept failed: {:?}", e);
                    continue;
                }
            };

            info!("Peer connected");
            serve(&server, &conn, &mut session).await;
            session.reset();
            info!("Peer disconnected");
        }
    };

    join(host, peripheral_loop).await;
}

/// Serve GATT events until the peer disconnects
async fn serve<P: PacketPool>(
    server: &PoiServer<'_>,
    conn: &GattConnection<'_, '_, P>,
    session: &mut LinkSession,
) {
    loop {
        let event = match conn.next().await {
            GattConnectionEvent::Disconnected { reason } => {
                info!("Disconnected: {:?}", reason);
                return;
            }
            GattConnectionEvent::Gatt { event } => event,
            _ => continue,
        };

        let outcome = match &event {
            GattEvent::Write(write) if write.handle() == server.poi.rx.handle => {
                session.set_mtu(conn.raw().att_mtu());
                Some(session.on_write(write.data(), uptime_ms()))
            }
            _ => None,
        };

        let response = match outcome {
            Some(WriteOutcome::Reject) => event.reject(AttErrorCode::INSUFFICIENT_RESOURCES),
            _ => event.accept(),
        };
        match response {
            Ok(reply) => reply.send().await,
            Err(e) => warn!("GATT response failed: {:?}", e),
        }

        if let Some(WriteOutcome::Accept(Some(reply))) = outcome {
            publish(server, conn, reply).await;
        }
    }
}

/// Store a reply in TX and notify it
async fn publish<P: PacketPool>(
    server: &PoiServer<'_>,
    conn: &GattConnection<'_, '_, P>,
    reply: Reply,
) {
    let value = ReplyValue::new(reply.encode().as_slice());
    if let Err(e) = server.poi.tx.set(server, &value) {
        warn!("TX update failed: {:?}", e);
    }
    if let Err(e) = server.poi.notify.notify(conn, &value).await {
        debug!("Reply notify failed: {:?}", e);
    }
}
