use crate::context::CliContext;

pub fn run_device(ctx: &CliContext) {
    println!("{}", ctx.client.device_id());
}
