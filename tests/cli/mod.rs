mod exit_codes;
