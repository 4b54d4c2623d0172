
// Currently the only device supported here is the DCA-X sampling scope family.
// If multiple manufacturers are ever supported, I'll probably organize them
// into modules by manufacturer

pub mod n1000a;
