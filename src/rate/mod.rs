
use crate::config::VideoStream;

/// overhead_rate_bps converts a per-packet header overhead into a bitrate,
/// capped so the overhead never exceeds the rate it is subtracted from.
pub(crate) fn overhead_rate_bps(
    packets_per_second: u32,
    overhead_bytes_per_packet: usize,
    max_overhead_bps: u32,
) -> u32 {
    let overhead_bps = (8 * overhead_bytes_per_packet as u64 * packets_per_second as u64)
        .min(u64::from(u32::MAX)) as u32;
    overhead_bps.min(max_overhead_bps)
}

/// packet_rate estimates packets per second as ceil(bitrate / packet bits).
pub(crate) fn packet_rate(bitrate_bps: u32, packet_size_bytes: usize) -> u32 {
    let packet_size_bits = 8 * packet_size_bytes as u64;
    ((u64::from(bitrate_bps) + packet_size_bits - 1) / packet_size_bits) as u32
}

/// max_padding_bitrate_bps computes the rate the allocator may pad up to.
/// With multiple layers: pad to the minimum of the highest layer plus the
/// target rates of every lower layer. With a single layer only pad when the
/// stream must not be suspended below its minimum. The result is never below
/// `min_transmit_bitrate_bps`.
pub(crate) fn max_padding_bitrate_bps(
    streams: &[VideoStream],
    min_transmit_bitrate_bps: u32,
    pad_to_min_bitrate: bool,
) -> u32 {
    let mut pad_up_to_bitrate_bps = 0;
    if streams.len() > 1 {
        pad_up_to_bitrate_bps = streams[streams.len() - 1].min_bitrate_bps;
        for stream in &streams[..streams.len() - 1] {
            pad_up_to_bitrate_bps += stream.target_bitrate_bps;
        }
    } else if pad_to_min_bitrate {
        pad_up_to_bitrate_bps = streams[0].min_bitrate_bps;
    }

    pad_up_to_bitrate_bps.max(min_transmit_bitrate_bps)
}
